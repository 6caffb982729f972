use serde::{Deserialize, Serialize};

/// Which session endpoint family the backend exposes.
///
/// The two families are mutually incompatible, so a deployment picks one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionApi {
    /// `GET /session/list`, `GET /session/load/{id}`
    #[default]
    #[serde(rename = "path")]
    PathParams,
    /// `GET /sessions`, `POST /sessions/load`
    #[serde(rename = "body")]
    JsonBody,
}

impl SessionApi {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionApi::PathParams => "path",
            SessionApi::JsonBody => "body",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "path" => Some(SessionApi::PathParams),
            "body" => Some(SessionApi::JsonBody),
            _ => None,
        }
    }

    pub fn all() -> Vec<SessionApi> {
        vec![SessionApi::PathParams, SessionApi::JsonBody]
    }

    /// Short label for the header
    pub fn display_name(&self) -> &'static str {
        match self {
            SessionApi::PathParams => "path sessions",
            SessionApi::JsonBody => "body sessions",
        }
    }

    /// Whether a 404 from the list endpoint means "sessions unsupported"
    /// rather than an error.
    pub fn tolerates_missing_list(&self) -> bool {
        matches!(self, SessionApi::PathParams)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_is_case_insensitive() {
        assert_eq!(SessionApi::from_str("PATH"), Some(SessionApi::PathParams));
        assert_eq!(SessionApi::from_str("body"), Some(SessionApi::JsonBody));
        assert_eq!(SessionApi::from_str("query"), None);
    }

    #[test]
    fn test_serde_names_match_as_str() {
        for api in SessionApi::all() {
            let json = serde_json::to_string(&api).unwrap();
            assert_eq!(json, format!("\"{}\"", api.as_str()));
        }
    }
}
