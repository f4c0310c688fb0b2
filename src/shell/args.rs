//! Command-line parsing
//!
//! Arguments are read in two passes. The first finds the first positional
//! argument: it names the script, and everything after it belongs to the
//! script's `arguments` array. The second turns the flags before it into
//! an ordered list of [`Action`]s, so `-v` and `-w` interleave correctly
//! with `-f`.
//!
//! Only the second character of a flag is looked at (`-wfoo` is `-w`).

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    #[error("unknown option: {0}")]
    UnknownOption(String),

    #[error("option {0} requires a parameter")]
    MissingParameter(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// `-v <n>`
    SetVersion(u32),
    /// `-w` / `-W`
    Warnings(bool),
    /// `-s`
    ToggleStrict,
    /// `-P`
    Seal,
    /// `-c <n>`
    ChunkSize(usize),
    /// `-b <n>`
    BranchLimit(u32),
    /// `-f <file>`
    RunFile(String),
    /// `-S <n>`
    MaxStack(usize),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    pub actions: Vec<Action>,
    /// The positional script, `-` meaning standard input.
    pub filename: Option<String>,
    pub script_args: Vec<String>,
}

impl Invocation {
    /// No script named and no `-f` given: read units from the prompt.
    pub fn interactive(&self) -> bool {
        self.filename.is_none()
            && !self
                .actions
                .iter()
                .any(|action| matches!(action, Action::RunFile(_)))
    }
}

fn is_positional(arg: &str) -> bool {
    !arg.starts_with('-') || arg.len() == 1
}

fn takes_parameter(flag: char) -> bool {
    matches!(flag, 'b' | 'c' | 'f' | 'v' | 'S')
}

/// Leading decimal integer of `text`, 0 when there is none.
pub fn atoi(text: &str) -> i64 {
    let s = text.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let mut value: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        value = value.saturating_mul(10).saturating_add((b - b'0') as i64);
    }
    if negative {
        -value
    } else {
        value
    }
}

/// Advances past the flag at `*index` to its parameter.
fn parameter<'a>(args: &'a [String], index: &mut usize) -> Result<&'a String, UsageError> {
    let flag = &args[*index];
    *index += 1;
    args.get(*index)
        .ok_or_else(|| UsageError::MissingParameter(flag.clone()))
}

pub fn parse_arguments(args: &[String]) -> Result<Invocation, UsageError> {
    let mut invocation = Invocation::default();

    // First pass: where do the script's own arguments start?
    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        if is_positional(arg) {
            invocation.script_args = args[i + 1..].to_vec();
            break;
        }
        if arg.chars().nth(1).is_some_and(takes_parameter) {
            i += 1;
        }
        i += 1;
    }

    // Second pass: the flags themselves.
    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        if is_positional(arg) {
            invocation.filename = Some(arg.clone());
            break;
        }

        let flag = arg.chars().nth(1).unwrap_or('-');
        let action = match flag {
            'v' => Action::SetVersion(u32::try_from(atoi(parameter(args, &mut i)?)).unwrap_or(0)),
            'w' => Action::Warnings(true),
            'W' => Action::Warnings(false),
            's' => Action::ToggleStrict,
            'P' => Action::Seal,
            'c' => Action::ChunkSize(usize::try_from(atoi(parameter(args, &mut i)?)).unwrap_or(0)),
            'b' => Action::BranchLimit(u32::try_from(atoi(parameter(args, &mut i)?)).unwrap_or(0)),
            'f' => Action::RunFile(parameter(args, &mut i)?.clone()),
            'S' => Action::MaxStack(usize::try_from(atoi(parameter(args, &mut i)?)).unwrap_or(0)),
            _ => return Err(UsageError::UnknownOption(arg.clone())),
        };
        invocation.actions.push(action);
        i += 1;
    }

    Ok(invocation)
}
