//! 버전 범위 매칭
//!
//! 생태계마다 버전 표기가 달라 SemVer로 바로 파싱되지 않는 경우가 많습니다.
//! `v1.2.3` (Go), `2.0` (PyPI), `1.2.3.4` (NuGet) 같은 표기를 SemVer로 정규화한 뒤
//! 비교하고, 정규화가 불가능하면 문자열 비교로 fallback합니다.

use super::db::VersionRange;

/// 버전 문자열을 SemVer로 정규화합니다.
///
/// - 앞의 `v` 제거
/// - 누락된 minor/patch는 0으로 채움
/// - 네 번째 이후 숫자 구성요소는 build 메타데이터로 이동
pub fn parse_lenient(raw: &str) -> Option<semver::Version> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
    if let Ok(v) = semver::Version::parse(trimmed) {
        return Some(v);
    }

    let (core, suffix) = match trimmed.find(['-', '+']) {
        Some(pos) => trimmed.split_at(pos),
        None => (trimmed, ""),
    };
    let parts: Vec<&str> = core.split('.').collect();
    if parts.is_empty() || parts.iter().any(|p| p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit())) {
        return None;
    }

    let mut normalized = format!(
        "{}.{}.{}",
        parts[0],
        parts.get(1).unwrap_or(&"0"),
        parts.get(2).unwrap_or(&"0")
    );
    normalized.push_str(suffix);
    if parts.len() > 3 && !suffix.contains('+') {
        normalized.push('+');
        normalized.push_str(&parts[3..].join("."));
    }
    semver::Version::parse(&normalized).ok()
}

/// 주어진 버전이 영향 범위 중 하나에 포함되는지 확인합니다.
///
/// `introduced <= version < fixed`이면 영향받습니다. 경계가 없으면 제한하지 않습니다.
/// 범위 목록이 비어있으면 영향받지 않습니다.
pub fn is_affected(version: &str, ranges: &[VersionRange]) -> bool {
    ranges.iter().any(|range| match parse_lenient(version) {
        Some(parsed) => in_range_semver(&parsed, range),
        None => in_range_string(version, range),
    })
}

fn in_range_semver(version: &semver::Version, range: &VersionRange) -> bool {
    if let Some(introduced) = range.introduced.as_deref().and_then(parse_lenient)
        && version < &introduced
    {
        return false;
    }

    if let Some(fixed) = range.fixed.as_deref().and_then(parse_lenient)
        && version >= &fixed
    {
        return false;
    }

    true
}

fn in_range_string(version: &str, range: &VersionRange) -> bool {
    if let Some(introduced) = range.introduced.as_deref()
        && version < introduced
    {
        return false;
    }

    if let Some(fixed) = range.fixed.as_deref()
        && version >= fixed
    {
        return false;
    }

    true
}
