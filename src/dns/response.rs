//! Block policy and synthesized answers for blocked queries.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use hickory_proto::op::{Message, MessageType, Query, ResponseCode};
use hickory_proto::rr::rdata::{A, AAAA};
use hickory_proto::rr::{RData, Record, RecordType};

use crate::error::ValidationError;

/// Default TTL of synthesized answers: 6 hours.
pub const DEFAULT_BLOCK_TTL: u32 = 21600;

/// Policy for the answer returned to a blocked query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BlockType {
    /// `0.0.0.0` for A, `::` for AAAA.
    #[default]
    ZeroIp,
    /// Empty answer with NXDOMAIN.
    NxDomain,
    /// The configured address for queries of its family.
    CustomIp(IpAddr),
}

impl FromStr for BlockType {
    type Err = ValidationError;

    /// Case-insensitive; an empty value selects [`BlockType::ZeroIp`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("zeroip") {
            return Ok(Self::ZeroIp);
        }
        if value.eq_ignore_ascii_case("nxdomain") {
            return Ok(Self::NxDomain);
        }
        value
            .parse::<IpAddr>()
            .map(Self::CustomIp)
            .map_err(|_| ValidationError::UnknownBlockType {
                value: s.to_string(),
            })
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroIp => f.write_str("ZeroIP"),
            Self::NxDomain => f.write_str("NxDomain"),
            Self::CustomIp(ip) => write!(f, "{ip}"),
        }
    }
}

impl BlockType {
    /// Answer data for a question of `query_type`, if the policy has any.
    fn rdata(self, query_type: RecordType) -> Option<RData> {
        match (self, query_type) {
            (Self::ZeroIp, RecordType::A) => Some(RData::A(A(Ipv4Addr::UNSPECIFIED))),
            (Self::ZeroIp, RecordType::AAAA) => Some(RData::AAAA(AAAA(Ipv6Addr::UNSPECIFIED))),
            (Self::CustomIp(IpAddr::V4(ip)), RecordType::A) => Some(RData::A(A(ip))),
            (Self::CustomIp(IpAddr::V6(ip)), RecordType::AAAA) => Some(RData::AAAA(AAAA(ip))),
            _ => None,
        }
    }

    /// Build the answer to a blocked `query`, covering every question.
    #[must_use]
    pub fn blocked_response(self, query: &Message, ttl: u32) -> Message {
        self.blocked_response_for(query, ttl, |_| true)
    }

    /// Build the answer to a `query` whose questions matching `blocked`
    /// were blocked.
    ///
    /// The response echoes the query id, op code, questions and the
    /// recursion-desired flag. Each blocked question of a type the policy
    /// covers gets exactly one answer record with `ttl`; other questions
    /// get no record. [`BlockType::NxDomain`] answers NXDOMAIN with no
    /// records.
    #[must_use]
    pub fn blocked_response_for<F>(self, query: &Message, ttl: u32, blocked: F) -> Message
    where
        F: Fn(&Query) -> bool,
    {
        let mut response = Message::new();
        response
            .set_id(query.id())
            .set_message_type(MessageType::Response)
            .set_op_code(query.op_code())
            .set_recursion_desired(query.recursion_desired())
            .set_recursion_available(true);

        for question in query.queries() {
            response.add_query(question.clone());
        }

        if self == Self::NxDomain {
            response.set_response_code(ResponseCode::NXDomain);
            return response;
        }

        response.set_response_code(ResponseCode::NoError);
        for question in query.queries().iter().filter(|&question| blocked(question)) {
            if let Some(rdata) = self.rdata(question.query_type()) {
                response.add_answer(Record::from_rdata(question.name().clone(), ttl, rdata));
            }
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hickory_proto::op::OpCode;
    use hickory_proto::rr::Name;

    fn query(domain: &str, query_type: RecordType) -> Message {
        let mut message = Message::new();
        message
            .set_id(4321)
            .set_op_code(OpCode::Query)
            .set_recursion_desired(true);
        message.add_query(Query::query(Name::from_str(domain).unwrap(), query_type));
        message
    }

    #[test]
    fn should_parse_block_types_case_insensitively() {
        assert_eq!("".parse::<BlockType>(), Ok(BlockType::ZeroIp));
        assert_eq!("ZeroIP".parse::<BlockType>(), Ok(BlockType::ZeroIp));
        assert_eq!("zeroip".parse::<BlockType>(), Ok(BlockType::ZeroIp));
        assert_eq!("NxDomain".parse::<BlockType>(), Ok(BlockType::NxDomain));
        assert_eq!("NXDOMAIN".parse::<BlockType>(), Ok(BlockType::NxDomain));
        assert_eq!(
            "192.168.178.2".parse::<BlockType>(),
            Ok(BlockType::CustomIp(IpAddr::V4(Ipv4Addr::new(192, 168, 178, 2))))
        );
        assert_eq!(
            "wrong".parse::<BlockType>(),
            Err(ValidationError::UnknownBlockType {
                value: "wrong".to_string()
            })
        );
    }

    #[test]
    fn should_display_block_types() {
        assert_eq!(BlockType::ZeroIp.to_string(), "ZeroIP");
        assert_eq!(BlockType::NxDomain.to_string(), "NxDomain");
        assert_eq!(
            BlockType::CustomIp("::1".parse().unwrap()).to_string(),
            "::1"
        );
    }

    #[test]
    fn should_answer_zero_ipv4_for_a_query() {
        let response =
            BlockType::ZeroIp.blocked_response(&query("blocked1.com.", RecordType::A), 21600);

        assert_eq!(response.id(), 4321);
        assert_eq!(response.message_type(), MessageType::Response);
        assert_eq!(response.response_code(), ResponseCode::NoError);
        assert!(response.recursion_desired());
        assert_eq!(response.queries().len(), 1);
        assert_eq!(response.answers().len(), 1);

        let answer = &response.answers()[0];
        assert_eq!(answer.name().to_string(), "blocked1.com.");
        assert_eq!(answer.ttl(), 21600);
        assert_eq!(answer.record_type(), RecordType::A);
        assert_eq!(answer.data().as_a().map(|a| a.0), Some(Ipv4Addr::UNSPECIFIED));
    }

    #[test]
    fn should_answer_zero_ipv6_for_aaaa_query() {
        let response =
            BlockType::ZeroIp.blocked_response(&query("blocked1.com.", RecordType::AAAA), 21600);

        assert_eq!(response.response_code(), ResponseCode::NoError);
        assert_eq!(response.answers().len(), 1);
        let answer = &response.answers()[0];
        assert_eq!(answer.record_type(), RecordType::AAAA);
        assert_eq!(
            answer.data().as_aaaa().map(|aaaa| aaaa.0),
            Some(Ipv6Addr::UNSPECIFIED)
        );
    }

    #[test]
    fn should_answer_nxdomain_without_records() {
        for query_type in [RecordType::A, RecordType::AAAA, RecordType::MX] {
            let response =
                BlockType::NxDomain.blocked_response(&query("blocked1.com.", query_type), 21600);

            assert_eq!(response.response_code(), ResponseCode::NXDomain);
            assert!(response.answers().is_empty());
            assert_eq!(response.queries().len(), 1);
        }
    }

    #[test]
    fn should_answer_custom_ip_of_matching_family() {
        let block_type = BlockType::CustomIp("192.168.178.2".parse().unwrap());

        let response = block_type.blocked_response(&query("blocked1.com.", RecordType::A), 60);
        assert_eq!(response.answers().len(), 1);
        assert_eq!(response.answers()[0].ttl(), 60);
        assert_eq!(
            response.answers()[0].data().as_a().map(|a| a.0),
            Some(Ipv4Addr::new(192, 168, 178, 2))
        );

        let response = block_type.blocked_response(&query("blocked1.com.", RecordType::AAAA), 60);
        assert_eq!(response.response_code(), ResponseCode::NoError);
        assert!(response.answers().is_empty());
    }

    #[test]
    fn should_answer_only_blocked_questions() {
        let mut message = query("allowed.com.", RecordType::A);
        message.add_query(Query::query(
            Name::from_str("blocked1.com.").unwrap(),
            RecordType::A,
        ));

        let response = BlockType::ZeroIp.blocked_response_for(&message, 21600, |question| {
            question.name().to_utf8() == "blocked1.com."
        });

        assert_eq!(response.queries().len(), 2);
        assert_eq!(response.answers().len(), 1);
        assert_eq!(response.answers()[0].name().to_string(), "blocked1.com.");
    }

    #[test]
    fn should_answer_empty_noerror_for_other_record_types() {
        let response =
            BlockType::ZeroIp.blocked_response(&query("blocked1.com.", RecordType::MX), 21600);

        assert_eq!(response.response_code(), ResponseCode::NoError);
        assert!(response.answers().is_empty());
    }
}
