use crate::store::SessionBehavior;
use std::convert::TryFrom;
use tokio::time::Duration;

pub(super) const DEFAULT_SESSION_TTL: &str = "30s";
pub(super) const MIN_SESSION_TTL: Duration = Duration::from_secs(10);
pub(super) const MAX_SESSION_TTL: Duration = Duration::from_secs(86400);
const MIN_KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Clone, Debug, Default)]
pub struct CandidateOptions {
    /// Requested session TTL, e.g. "30s" or "2m". Defaults to "30s". Values outside of
    /// [10s, 86400s] are clamped before being sent to the store.
    pub session_ttl: Option<String>,
    /// Defaults to `SessionBehavior::Delete`, which deletes the lock entry when the leader's
    /// session goes away.
    pub session_behavior: Option<SessionBehavior>,
}

#[derive(Debug)]
pub(super) struct CandidateOptionsValidated {
    pub session_ttl: Duration,
    pub wire_session_ttl: String,
    pub keep_alive_interval: Duration,
    pub long_poll_wait: Duration,
    pub session_behavior: SessionBehavior,
}

impl TryFrom<CandidateOptions> for CandidateOptionsValidated {
    type Error = String;

    fn try_from(options: CandidateOptions) -> Result<Self, Self::Error> {
        let raw_ttl = match options.session_ttl.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_SESSION_TTL,
            Some(ttl) => ttl,
        };
        let session_ttl = humantime::parse_duration(raw_ttl)
            .map_err(|e| format!("unable to parse provided TTL \"{}\": {}", raw_ttl, e))?;

        let clamped_ttl = session_ttl.clamp(MIN_SESSION_TTL, MAX_SESSION_TTL);

        Ok(CandidateOptionsValidated {
            session_ttl,
            wire_session_ttl: format!("{}s", clamped_ttl.as_secs()),
            // Renew against what the store actually enforces, a huge requested TTL would otherwise
            // let the session lapse between renewals.
            keep_alive_interval: (session_ttl.min(clamped_ttl) / 2).max(MIN_KEEP_ALIVE_INTERVAL),
            // Block on the clamped value, a tiny requested TTL would otherwise spin the loop.
            long_poll_wait: clamped_ttl,
            session_behavior: options.session_behavior.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate(ttl: Option<&str>) -> Result<CandidateOptionsValidated, String> {
        CandidateOptionsValidated::try_from(CandidateOptions {
            session_ttl: ttl.map(str::to_string),
            session_behavior: None,
        })
    }

    #[test]
    fn ttl_defaults_to_30s() {
        let options = validate(None).unwrap();
        assert_eq!(options.wire_session_ttl, "30s");
        assert_eq!(options.session_ttl, Duration::from_secs(30));
        assert_eq!(options.keep_alive_interval, Duration::from_secs(15));
        assert_eq!(options.session_behavior, SessionBehavior::Delete);

        assert_eq!(validate(Some("")).unwrap().wire_session_ttl, "30s");
    }

    #[test]
    fn ttl_is_clamped_on_the_wire_only() {
        let short = validate(Some("1s")).unwrap();
        assert_eq!(short.wire_session_ttl, "10s");
        assert_eq!(short.session_ttl, Duration::from_secs(1));
        assert_eq!(short.keep_alive_interval, Duration::from_secs(1));
        assert_eq!(short.long_poll_wait, Duration::from_secs(10));

        let long = validate(Some("999999s")).unwrap();
        assert_eq!(long.wire_session_ttl, "86400s");
        assert_eq!(long.session_ttl, Duration::from_secs(999999));
        assert_eq!(long.keep_alive_interval, Duration::from_secs(43200));
    }

    #[test]
    fn ttl_in_range_is_kept() {
        let options = validate(Some("2m")).unwrap();
        assert_eq!(options.wire_session_ttl, "120s");
        assert_eq!(options.keep_alive_interval, Duration::from_secs(60));
    }

    #[test]
    fn unparsable_ttl_is_rejected() {
        let err = validate(Some("soon")).unwrap_err();
        assert!(err.contains("soon"), "{}", err);
    }
}
