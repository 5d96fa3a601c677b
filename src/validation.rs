use lazy_static::lazy_static;
use regex::Regex;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Collects field violations so a request reports all of them at once.
#[derive(Debug, Default)]
pub struct Violations(Vec<String>);

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, field: &str, ok: bool, rule: &str) -> &mut Self {
        if !ok {
            self.0.push(format!("Field {field} is invalid: {rule}"));
        }
        self
    }

    /// Checks `required` first and skips `rule` for a missing value.
    pub fn check_present(
        &mut self,
        field: &str,
        value: &str,
        rule: Option<(&str, bool)>,
    ) -> &mut Self {
        if value.trim().is_empty() {
            return self.check(field, false, "required");
        }
        match rule {
            Some((name, ok)) => self.check(field, ok, name),
            None => self,
        }
    }

    pub fn finish(self) -> Result<(), Vec<String>> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(self.0)
        }
    }
}
