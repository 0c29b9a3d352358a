//! Interactive enrollment dialogue.
//!
//! Runs once per new card presented in ADMIN mode. The operator is asked for
//! a group name and a color on the [`OperatorConsole`]; each answer has its
//! own timeout. Any failure aborts without touching the registry.

use alloc::format;
use alloc::string::String;

use thiserror::Error;

use crate::config::MAX_LINE_CHARS;
use crate::credential::{ColorError, HexColor, Uid};
use crate::registry::{Registry, RegistryError, UserEntry};
use crate::traits::{KeyValueStore, OperatorConsole};

/// Which answer the dialogue was waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollStep {
    /// Group name prompt
    Group,
    /// Color prompt
    Color,
}

impl core::fmt::Display for EnrollStep {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            EnrollStep::Group => f.write_str("group"),
            EnrollStep::Color => f.write_str("color"),
        }
    }
}

/// Why an enrollment was abandoned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnrollError {
    /// Operator entered an empty group name.
    #[error("group name is empty")]
    EmptyGroup,
    /// No answer arrived in time.
    #[error("timed out waiting for {0}")]
    Timeout(EnrollStep),
    /// Color answer is not six hex digits.
    #[error("invalid color: {0}")]
    InvalidColor(ColorError),
    /// The card is already known.
    #[error("card is already registered")]
    Duplicate,
    /// Registry could not persist the new entry.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl From<RegistryError> for EnrollError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::DuplicateUid(_) | RegistryError::AdminCredential(_) => {
                EnrollError::Duplicate
            }
            RegistryError::EmptyGroup => EnrollError::EmptyGroup,
            RegistryError::AdminAlreadySet => EnrollError::Storage(format!("{}", err)),
            RegistryError::Storage(msg) => EnrollError::Storage(msg),
        }
    }
}

/// Ask for group and color, then add the user to `registry`.
///
/// Returns the committed entry. Every outcome, success or abort, is also
/// reported to the operator on `console`.
///
/// # Example
///
/// ```rust
/// use rfid_warden::enrollment;
/// use rfid_warden::hal::{MockConsole, MockStore};
/// use rfid_warden::{Registry, Uid};
///
/// let mut registry = Registry::load(MockStore::new());
/// let mut console = MockConsole::with_replies(["ops", "ff00aa"]);
/// let uid = Uid::from_hex("E5F6").unwrap();
///
/// let entry = enrollment::run(&uid, &mut console, &mut registry, 15_000).unwrap();
/// assert_eq!(entry.color.to_string(), "#FF00AA");
/// assert_eq!(registry.users().len(), 1);
/// ```
pub fn run<S, C>(
    uid: &Uid,
    console: &mut C,
    registry: &mut Registry<S>,
    prompt_timeout_ms: u64,
) -> Result<UserEntry, EnrollError>
where
    S: KeyValueStore,
    C: OperatorConsole,
{
    match dialogue(uid, console, registry, prompt_timeout_ms) {
        Ok(entry) => {
            console.write_line(&format!(
                "Registered {} group={} color={}",
                entry.uid, entry.group, entry.color
            ));
            tracing::info!(uid = %entry.uid, group = %entry.group, color = %entry.color, "user enrolled");
            Ok(entry)
        }
        Err(err) => {
            console.write_line(&format!("Enrollment aborted: {}", err));
            tracing::warn!(uid = %uid, error = %err, "enrollment aborted");
            Err(err)
        }
    }
}

fn dialogue<S, C>(
    uid: &Uid,
    console: &mut C,
    registry: &mut Registry<S>,
    prompt_timeout_ms: u64,
) -> Result<UserEntry, EnrollError>
where
    S: KeyValueStore,
    C: OperatorConsole,
{
    console.write_line(&format!("New card {}. Enter group name:", uid));
    let group = ask(console, prompt_timeout_ms, EnrollStep::Group)?;
    if group.is_empty() {
        return Err(EnrollError::EmptyGroup);
    }

    console.write_line("Enter color (RRGGBB or #RRGGBB):");
    let answer = ask(console, prompt_timeout_ms, EnrollStep::Color)?;
    let color = HexColor::parse(&answer).map_err(EnrollError::InvalidColor)?;

    let entry = UserEntry::new(uid.clone(), &group, color)?;
    registry.add_user(entry.clone())?;
    Ok(entry)
}

/// Read one answer, trimmed and capped at [`MAX_LINE_CHARS`].
fn ask<C: OperatorConsole>(
    console: &mut C,
    timeout_ms: u64,
    step: EnrollStep,
) -> Result<String, EnrollError> {
    let line = console
        .read_line(timeout_ms)
        .ok_or(EnrollError::Timeout(step))?;
    Ok(line.trim().chars().take(MAX_LINE_CHARS).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{MockConsole, MockStore};
    use alloc::string::ToString;

    fn uid(s: &str) -> Uid {
        Uid::from_hex(s).unwrap()
    }

    fn registry() -> Registry<MockStore> {
        Registry::load(MockStore::new())
    }

    #[test]
    fn happy_path_normalizes_color() {
        let mut reg = registry();
        let mut console = MockConsole::with_replies(["ops", "ff00aa"]);
        let entry = run(&uid("E5F6"), &mut console, &mut reg, 1_000).unwrap();

        assert_eq!(entry.group, "ops");
        assert_eq!(entry.color.to_string(), "#FF00AA");
        assert_eq!(reg.users(), &[entry]);
        assert!(console.output().iter().any(|l| l.starts_with("Registered E5F6")));
    }

    #[test]
    fn prompts_in_order() {
        let mut reg = registry();
        let mut console = MockConsole::with_replies(["eng", "#00FF00"]);
        run(&uid("C3D4"), &mut console, &mut reg, 1_000).unwrap();

        let out = console.output();
        assert_eq!(out[0], "New card C3D4. Enter group name:");
        assert_eq!(out[1], "Enter color (RRGGBB or #RRGGBB):");
    }

    #[test]
    fn group_timeout_aborts() {
        let mut reg = registry();
        let mut console = MockConsole::new();
        assert_eq!(
            run(&uid("E5F6"), &mut console, &mut reg, 1_000),
            Err(EnrollError::Timeout(EnrollStep::Group))
        );
        assert!(reg.users().is_empty());
    }

    #[test]
    fn color_timeout_aborts() {
        let mut reg = registry();
        let mut console = MockConsole::with_replies(["ops"]);
        assert_eq!(
            run(&uid("E5F6"), &mut console, &mut reg, 1_000),
            Err(EnrollError::Timeout(EnrollStep::Color))
        );
        assert!(reg.users().is_empty());
    }

    #[test]
    fn blank_group_aborts_before_color_prompt() {
        let mut reg = registry();
        let mut console = MockConsole::with_replies(["   ", "ff00aa"]);
        assert_eq!(
            run(&uid("E5F6"), &mut console, &mut reg, 1_000),
            Err(EnrollError::EmptyGroup)
        );
        assert!(!console.output().iter().any(|l| l.starts_with("Enter color")));
    }

    #[test]
    fn invalid_color_aborts() {
        let mut reg = registry();
        let mut console = MockConsole::with_replies(["ops", "zzzzzz"]);
        assert!(matches!(
            run(&uid("E5F6"), &mut console, &mut reg, 1_000),
            Err(EnrollError::InvalidColor(_))
        ));
        assert!(reg.users().is_empty());
        assert!(console.output().iter().any(|l| l.starts_with("Enrollment aborted")));
    }

    #[test]
    fn duplicate_maps_to_duplicate() {
        let mut reg = registry();
        let color = HexColor::parse("#000000").unwrap();
        reg.add_user(UserEntry::new(uid("E5F6"), "eng", color).unwrap())
            .unwrap();

        let mut console = MockConsole::with_replies(["ops", "ff00aa"]);
        assert_eq!(
            run(&uid("E5F6"), &mut console, &mut reg, 1_000),
            Err(EnrollError::Duplicate)
        );
        assert_eq!(reg.users().len(), 1);
        assert_eq!(reg.users()[0].group, "eng");
    }

    #[test]
    fn storage_failure_aborts() {
        let mut store = MockStore::new();
        store.fail_writes = true;
        let mut reg = Registry::load(store);
        let mut console = MockConsole::with_replies(["ops", "ff00aa"]);
        assert!(matches!(
            run(&uid("E5F6"), &mut console, &mut reg, 1_000),
            Err(EnrollError::Storage(_))
        ));
        assert!(reg.users().is_empty());
    }

    #[test]
    fn long_group_is_capped() {
        let mut reg = registry();
        let long = "g".repeat(300);
        let mut console = MockConsole::with_replies([long.as_str(), "123456"]);
        let entry = run(&uid("E5F6"), &mut console, &mut reg, 1_000).unwrap();
        assert_eq!(entry.group.chars().count(), MAX_LINE_CHARS);
    }

    #[test]
    fn prompt_timeout_is_forwarded() {
        let mut reg = registry();
        let mut console = MockConsole::with_replies(["ops", "ff00aa"]);
        run(&uid("E5F6"), &mut console, &mut reg, 7_500).unwrap();
        assert_eq!(console.timeouts(), &[7_500, 7_500]);
    }
}
