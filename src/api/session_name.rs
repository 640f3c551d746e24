use rand::distributions::Alphanumeric;
use rand::Rng;
use std::fmt;
use std::str::FromStr;

const SESSION_NAME_PREFIX: &str = "leader";
const SESSION_NAME_FIELDS: usize = 4;
const RANDOM_TOKEN_LEN: usize = 22;

/// The four fields of a candidate's session name, `leader-{id}-{nodeName}-{randomToken}`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SessionNameParts {
    pub prefix: String,
    pub id: String,
    pub node_name: String,
    pub random_uuid: String,
}

#[derive(Debug, Eq, PartialEq, thiserror::Error)]
#[error("expected four parts in session name \"{name}\", saw {fields}")]
pub struct ParseSessionNameError {
    pub name: String,
    pub fields: usize,
}

/// Splits a session name created by a `Candidate` into its parts.
///
/// Fields are split on every `-`, so names built from a candidate id that itself contains `-`
/// (e.g. "test-1") have more than four fields and are rejected.
pub fn parse_session_name(name: &str) -> Result<SessionNameParts, ParseSessionNameError> {
    let fields: Vec<&str> = name.split('-').collect();
    if fields.len() != SESSION_NAME_FIELDS {
        return Err(ParseSessionNameError {
            name: name.to_string(),
            fields: fields.len(),
        });
    }

    Ok(SessionNameParts {
        prefix: fields[0].to_string(),
        id: fields[1].to_string(),
        node_name: fields[2].to_string(),
        random_uuid: fields[3].to_string(),
    })
}

impl FromStr for SessionNameParts {
    type Err = ParseSessionNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_session_name(s)
    }
}

impl fmt::Display for SessionNameParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}-{}", self.prefix, self.id, self.node_name, self.random_uuid)
    }
}

/// The random token keeps candidates that restart with the same id on the same node from reusing
/// a name.
pub(super) fn new_session_name(id: &str, node_name: &str) -> String {
    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_TOKEN_LEN)
        .map(char::from)
        .collect();

    SessionNameParts {
        prefix: SESSION_NAME_PREFIX.to_string(),
        id: id.to_string(),
        node_name: node_name.to_string(),
        random_uuid: token,
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_four_fields() {
        let parts = parse_session_name("leader-svcA-node1-abc123").unwrap();

        assert_eq!(
            parts,
            SessionNameParts {
                prefix: "leader".to_string(),
                id: "svcA".to_string(),
                node_name: "node1".to_string(),
                random_uuid: "abc123".to_string(),
            }
        );
        assert_eq!(parts.to_string(), "leader-svcA-node1-abc123");
    }

    #[test]
    fn rejects_wrong_field_count() {
        assert_eq!(
            parse_session_name("leader-svcA-node1"),
            Err(ParseSessionNameError {
                name: "leader-svcA-node1".to_string(),
                fields: 3,
            })
        );
        assert_eq!(parse_session_name("leader-svc-A-node1-abc123").unwrap_err().fields, 5);
        assert!("".parse::<SessionNameParts>().is_err());
    }

    #[test]
    fn new_names_parse_back() {
        let name = new_session_name("10.0.0.7", "node1");
        let parts: SessionNameParts = name.parse().unwrap();

        assert_eq!(parts.prefix, "leader");
        assert_eq!(parts.id, "10.0.0.7");
        assert_eq!(parts.node_name, "node1");
        assert_eq!(parts.random_uuid.len(), RANDOM_TOKEN_LEN);
        assert_ne!(new_session_name("10.0.0.7", "node1"), name);
    }

    #[test]
    fn dashed_id_yields_unparsable_name() {
        let name = new_session_name("test-1", "node1");

        assert!(name.starts_with("leader-test-1-node1-"), "{}", name);
        assert_eq!(parse_session_name(&name).unwrap_err().fields, 5);
    }
}
