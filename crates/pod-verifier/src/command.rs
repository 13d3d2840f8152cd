//! 원격 명령 구성
//!
//! 모든 원격 명령은 argv 벡터로 만들어 실행 백엔드에 그대로 전달합니다.
//! 셸 문자열을 거치지 않으므로 패키지 이름이 명령으로 해석될 여지가 없습니다.
//! 패키지 이름은 경계에서 식별자 패턴으로 제한됩니다.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::VerifierError;

/// 패키지 이름 패턴 (언어 식별자 형식)
pub const PACKAGE_NAME_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_]*$";

static PACKAGE_NAME_RE: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(PACKAGE_NAME_PATTERN));

/// 패키지 이름이 식별자 패턴과 일치하는지 확인합니다.
///
/// `num-py`, `123abc`, 빈 문자열 등은 거부됩니다.
pub fn validate_package_name(name: &str) -> Result<(), VerifierError> {
    let re = PACKAGE_NAME_RE
        .as_ref()
        .map_err(|e| VerifierError::Validation(format!("invalid package name pattern: {e}")))?;
    if re.is_match(name) {
        Ok(())
    } else {
        Err(VerifierError::Validation(format!(
            "Invalid package name: '{name}'"
        )))
    }
}

/// 원격에서 실행할 명령
///
/// `argv`는 실행 백엔드에 그대로 전달되고, `display`는 보고서와 로그에만 쓰입니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommand {
    argv: Vec<String>,
    display: String,
}

impl RemoteCommand {
    /// 임의의 argv로 명령을 생성합니다.
    pub fn new(argv: Vec<String>) -> Self {
        let display = argv
            .iter()
            .map(|arg| quote_for_display(arg))
            .collect::<Vec<_>>()
            .join(" ");
        Self { argv, display }
    }

    /// `<runtime> -c 'import <package>'` 명령을 생성합니다.
    ///
    /// 호출 전에 [`validate_package_name`]으로 이름을 검증해야 합니다.
    pub fn import(runtime: &str, package: &str) -> Self {
        Self::snippet(runtime, &format!("import {package}"))
    }

    /// `<runtime> -c <code>` 명령을 생성합니다.
    pub fn snippet(runtime: &str, code: &str) -> Self {
        Self {
            argv: vec![runtime.to_owned(), "-c".to_owned(), code.to_owned()],
            display: format!("{runtime} -c '{}'", code.replace('\'', r"'\''")),
        }
    }

    /// 실행 백엔드에 전달할 argv
    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    /// 사람이 읽는 명령 문자열
    pub fn display(&self) -> &str {
        &self.display
    }
}

impl fmt::Display for RemoteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

fn quote_for_display(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | '='));
    if plain {
        arg.to_owned()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}
