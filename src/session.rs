use tracing::info;

/// The authenticated back office operator, if any. Passed down as a
/// plain value to whatever needs it; there is no global session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operator {
    pub name: String,
    pub email: String,
}

/// Where the current profile comes from. The real application fetches it
/// from the API; tests and the offline console provide their own source.
pub trait ProfileSource {
    fn current_profile(&self) -> Option<Operator>;
}

/// Reads the operator from STAYADMIN_OPERATOR / STAYADMIN_OPERATOR_EMAIL,
/// which is as much authentication as the offline console needs.
pub struct EnvProfileSource;

impl ProfileSource for EnvProfileSource {
    fn current_profile(&self) -> Option<Operator> {
        let name = std::env::var("STAYADMIN_OPERATOR").ok()?;
        let email = std::env::var("STAYADMIN_OPERATOR_EMAIL").unwrap_or_default();
        Some(Operator { name, email })
    }
}

#[derive(Debug, Default)]
pub struct Session {
    operator: Option<Operator>,
}

impl Session {
    pub fn initialize(source: &dyn ProfileSource) -> Self {
        let operator = source.current_profile();
        match &operator {
            Some(op) => info!("Session for {}", op.name),
            None => info!("Anonymous session"),
        }
        Session { operator }
    }

    pub fn operator(&self) -> Option<&Operator> {
        self.operator.as_ref()
    }

    /// Logout teardown.
    pub fn clear(&mut self) {
        self.operator = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSource(Option<Operator>);

    impl ProfileSource for FixedSource {
        fn current_profile(&self) -> Option<Operator> {
            self.0.clone()
        }
    }

    #[test]
    fn session_initializes_and_clears() {
        let source = FixedSource(Some(Operator {
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
        }));
        let mut session = Session::initialize(&source);
        assert_eq!(session.operator().unwrap().name, "Ana");
        session.clear();
        assert!(session.operator().is_none());
    }

    #[test]
    fn missing_profile_means_anonymous() {
        let session = Session::initialize(&FixedSource(None));
        assert!(session.operator().is_none());
    }
}
