//! Operation grammar
//!
//! A fixed, ordered table mapping operation keywords to a pattern over the
//! whole operation string, an argument coercion and the operation it yields.
//!
//! Every rule is tested against the same string; matching one rule never
//! consumes input for the others. Keywords only match whole path segments, so
//! `/comment/reflipped` does not trigger `flip`.

use super::types::{Dimensions, FrameGeometry, Geometry, Gravity, ResizeGeometry};
use super::Operation;
use crate::error::OperationError;
use regex::Regex;
use std::str::FromStr;
use std::sync::LazyLock;

static GRAMMAR: LazyLock<OperationGrammar> = LazyLock::new(OperationGrammar::build);

/// Reason a captured token could not be coerced.
#[derive(Debug)]
pub struct ArgumentError {
    argument: &'static str,
    reason: String,
}

impl ArgumentError {
    fn new(argument: &'static str, reason: impl Into<String>) -> Self {
        Self {
            argument,
            reason: reason.into(),
        }
    }
}

type Coerce = fn(&str) -> Result<Operation, ArgumentError>;

/// One grammar entry.
pub struct OperationRule {
    name: &'static str,
    pattern: Regex,
    arity: usize,
    coerce: Coerce,
}

/// Captured argument token of a matching rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult<'s> {
    pub operation: &'static str,
    pub arguments: Vec<&'s str>,
}

impl<'s> MatchResult<'s> {
    fn token(&self) -> &'s str {
        self.arguments.first().copied().unwrap_or_default()
    }
}

impl OperationRule {
    /// Keyword followed by no argument segment.
    fn bare(name: &'static str, coerce: Coerce) -> Self {
        Self::with_keywords(name, &[name], false, 0, coerce)
    }

    /// Keyword followed by one argument segment holding `arity` values.
    fn token(name: &'static str, arity: usize, coerce: Coerce) -> Self {
        Self::with_keywords(name, &[name], true, arity, coerce)
    }

    fn with_keywords(
        name: &'static str,
        keywords: &[&str],
        takes_token: bool,
        arity: usize,
        coerce: Coerce,
    ) -> Self {
        let alternatives = keywords
            .iter()
            .map(|k| regex::escape(k))
            .collect::<Vec<_>>()
            .join("|");
        let argument = if takes_token { "/([^/]*)" } else { "" };
        let source = format!("(?:^|/)(?:{}){}(?:/|$)", alternatives, argument);
        let pattern = Regex::new(&source).expect("operation grammar patterns are valid regexes");

        Self {
            name,
            pattern,
            arity,
            coerce,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Number of coerced values the operation takes.
    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    /// Test this rule against the whole operation string.
    pub fn matches<'s>(&self, operations: &'s str) -> Option<MatchResult<'s>> {
        let captures = self.pattern.captures(operations)?;
        let arguments = captures
            .iter()
            .skip(1)
            .flatten()
            .map(|m| m.as_str())
            .collect();

        Some(MatchResult {
            operation: self.name,
            arguments,
        })
    }

    /// Coerce the captured token into a typed operation.
    pub fn coerce(&self, matched: &MatchResult<'_>) -> Result<Operation, OperationError> {
        let token = matched.token();
        (self.coerce)(token).map_err(|e| {
            OperationError::invalid_argument(self.name, e.argument, token, e.reason)
        })
    }
}

impl std::fmt::Debug for OperationRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationRule")
            .field("name", &self.name)
            .field("pattern", &self.pattern.as_str())
            .field("arity", &self.arity)
            .finish()
    }
}

/// The process-wide operation table, in declaration order.
#[derive(Debug)]
pub struct OperationGrammar {
    rules: Vec<OperationRule>,
}

impl OperationGrammar {
    /// Shared grammar, built on first use and never mutated.
    pub fn global() -> &'static OperationGrammar {
        &GRAMMAR
    }

    pub fn rules(&self) -> &[OperationRule] {
        &self.rules
    }

    pub fn get(&self, name: &str) -> Option<&OperationRule> {
        self.rules.iter().find(|rule| rule.name == name)
    }

    pub fn keywords(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.iter().map(|rule| rule.name)
    }

    fn build() -> Self {
        use Operation as Op;

        let rules = vec![
            OperationRule::token("antialias", 1, |t| Ok(Op::Antialias(coerce_bool(t)))),
            OperationRule::bare("autoOrient", |_| Ok(Op::AutoOrient)),
            OperationRule::bare("backdrop", |_| Ok(Op::Backdrop)),
            OperationRule::token("blur", 1, |t| Ok(Op::Blur(int("radius", t)?))),
            OperationRule::token("border", 2, |t| Ok(Op::Border(dimensions(t)?))),
            OperationRule::token("borderColor", 1, |t| Ok(Op::BorderColor(raw("color", t)?))),
            OperationRule::token("box", 1, |t| Ok(Op::Box(raw("color", t)?))),
            OperationRule::token("charcoal", 1, |t| Ok(Op::Charcoal(int("factor", t)?))),
            OperationRule::token("chop", 4, |t| Ok(Op::Chop(geometry(t)?))),
            OperationRule::token("colors", 1, |t| Ok(Op::Colors(int("colors", t)?))),
            OperationRule::token("colorspace", 1, |t| Ok(Op::Colorspace(raw("colorspace", t)?))),
            OperationRule::token("compress", 1, |t| Ok(Op::Compress(raw("type", t)?))),
            OperationRule::token("comment", 1, |t| Ok(Op::Comment(t.to_string()))),
            OperationRule::token("contrast", 1, |t| Ok(Op::Contrast(int("multiplier", t)?))),
            OperationRule::token("crop", 4, |t| Ok(Op::Crop(geometry(t)?))),
            OperationRule::with_keywords("dissolve", &["dissolve", "disolve"], true, 1, |t| {
                let percent: u32 = int("percent", t)?;
                if percent > 100 {
                    return Err(ArgumentError::new("percent", "must be between 0 and 100"));
                }
                Ok(Op::Dissolve(percent))
            }),
            OperationRule::token("dither", 1, |t| Ok(Op::Dither(coerce_bool(t)))),
            OperationRule::token("emboss", 1, |t| Ok(Op::Emboss(int("radius", t)?))),
            OperationRule::bare("enhance", |_| Ok(Op::Enhance)),
            OperationRule::bare("equalize", |_| Ok(Op::Equalize)),
            OperationRule::token("extent", 2, |t| Ok(Op::Extent(dimensions(t)?))),
            OperationRule::token("filter", 1, |t| Ok(Op::Filter(raw("type", t)?))),
            OperationRule::bare("flip", |_| Ok(Op::Flip)),
            OperationRule::bare("flop", |_| Ok(Op::Flop)),
            OperationRule::token("foreground", 1, |t| Ok(Op::Foreground(raw("color", t)?))),
            OperationRule::token("frame", 4, |t| {
                FrameGeometry::parse(t)
                    .map(Op::Frame)
                    .map_err(|e| ArgumentError::new("geometry", e))
            }),
            OperationRule::token("gaussian", 2, |t| {
                let size = dimensions(t)?;
                Ok(Op::Gaussian {
                    radius: size.width,
                    sigma: size.height,
                })
            }),
            OperationRule::token("gravity", 1, |t| Ok(Op::Gravity(Gravity::from_token(t)))),
            OperationRule::token("implode", 1, |t| Ok(Op::Implode(int("factor", t)?))),
            OperationRule::token("lower", 2, |t| Ok(Op::Lower(dimensions(t)?))),
            OperationRule::token("matteColor", 1, |t| Ok(Op::MatteColor(raw("color", t)?))),
            OperationRule::bare("monochrome", |_| Ok(Op::Monochrome)),
            OperationRule::bare("negative", |_| Ok(Op::Negative)),
            OperationRule::bare("normalize", |_| Ok(Op::Normalize)),
            OperationRule::token("paint", 1, |t| Ok(Op::Paint(int("radius", t)?))),
            OperationRule::token("quality", 1, |t| Ok(Op::Quality(int("quality", t)?))),
            OperationRule::token("resize", 3, |t| {
                ResizeGeometry::parse(t)
                    .map(Op::Resize)
                    .map_err(|e| ArgumentError::new("geometry", e))
            }),
            OperationRule::token("rotate", 2, |t| {
                let (background, degrees) = t
                    .rsplit_once('+')
                    .ok_or_else(|| ArgumentError::new("geometry", "expected <color>+<degrees>"))?;
                Ok(Op::Rotate {
                    background: raw("color", background)?,
                    degrees: int("degrees", degrees)?,
                })
            }),
            OperationRule::token("scale", 2, |t| Ok(Op::Scale(dimensions(t)?))),
            OperationRule::token("sepia", 1, |t| Ok(Op::Sepia(int("threshold", t)?))),
            OperationRule::token("shadow", 2, |t| {
                let size = dimensions(t)?;
                Ok(Op::Shadow {
                    opacity: size.width,
                    sigma: size.height,
                })
            }),
            OperationRule::token("solarize", 1, |t| Ok(Op::Solarize(int("threshold", t)?))),
            OperationRule::token("swirl", 1, |t| Ok(Op::Swirl(int("degrees", t)?))),
            OperationRule::bare("trim", |_| Ok(Op::Trim)),
        ];

        Self { rules }
    }
}

fn coerce_bool(token: &str) -> bool {
    token == "true"
}

fn int<T>(argument: &'static str, token: &str) -> Result<T, ArgumentError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    token
        .parse::<T>()
        .map_err(|e| ArgumentError::new(argument, e.to_string()))
}

fn raw(argument: &'static str, token: &str) -> Result<String, ArgumentError> {
    if token.is_empty() {
        return Err(ArgumentError::new(argument, "value is empty"));
    }
    Ok(token.to_string())
}

fn dimensions(token: &str) -> Result<Dimensions, ArgumentError> {
    Dimensions::parse(token).map_err(|e| ArgumentError::new("geometry", e))
}

fn geometry(token: &str) -> Result<Geometry, ArgumentError> {
    Geometry::parse(token).map_err(|e| ArgumentError::new("geometry", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coerce(name: &str, operations: &str) -> Option<Result<Operation, OperationError>> {
        let rule = OperationGrammar::global().get(name).unwrap();
        rule.matches(operations).map(|m| rule.coerce(&m))
    }

    #[test]
    fn test_grammar_has_closed_vocabulary() {
        let keywords: Vec<_> = OperationGrammar::global().keywords().collect();
        assert_eq!(keywords.len(), 44);
        assert_eq!(keywords.first(), Some(&"antialias"));
        assert_eq!(keywords.last(), Some(&"trim"));
        let position = |name: &str| keywords.iter().position(|k| *k == name);
        assert!(position("blur") < position("resize"));
    }

    #[test]
    fn test_match_captures_token() {
        let rule = OperationGrammar::global().get("resize").unwrap();
        let matched = rule.matches("/resize/200x100!/blur/4").unwrap();
        assert_eq!(matched.operation, "resize");
        assert_eq!(matched.arguments, vec!["200x100!"]);
        assert_eq!(rule.arity(), 3);
    }

    #[test]
    fn test_keywords_match_whole_segments() {
        assert!(coerce("flip", "/comment/reflipped").is_none());
        assert!(coerce("flip", "/flipped").is_none());
        assert!(coerce("colors", "/colorspace/gray").is_none());
        assert!(coerce("box", "/box").is_none());
        assert!(coerce("flip", "/flip").is_some());
        assert!(coerce("flip", "/blur/2/flip/").is_some());
        assert!(coerce("flip", "flip").is_some());
    }

    #[test]
    fn test_bool_coercion() {
        let antialias = |path: &str| coerce("antialias", path).unwrap().unwrap();
        assert_eq!(antialias("/antialias/true"), Operation::Antialias(true));
        assert_eq!(antialias("/antialias/false"), Operation::Antialias(false));
        assert_eq!(antialias("/antialias/yes"), Operation::Antialias(false));
        assert_eq!(coerce("dither", "/dither/true/").unwrap().unwrap(), Operation::Dither(true));
    }

    #[test]
    fn test_numeric_coercion_failures() {
        let err = coerce("blur", "/blur/abc").unwrap().unwrap_err();
        match err {
            OperationError::InvalidOperationArgument {
                operation,
                argument,
                value,
                ..
            } => {
                assert_eq!(operation, "blur");
                assert_eq!(argument, "radius");
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(coerce("blur", "/blur/99999999999").unwrap().is_err());
        assert!(coerce("blur", "/blur//").unwrap().is_err());
        assert!(coerce("border", "/border/5").unwrap().is_err());
        assert!(coerce("contrast", "/contrast/abc").unwrap().is_err());
    }

    #[test]
    fn test_signed_contrast() {
        assert_eq!(coerce("contrast", "/contrast/-2").unwrap().unwrap(), Operation::Contrast(-2));
    }

    #[test]
    fn test_gravity_fallback() {
        assert_eq!(
            coerce("gravity", "/gravity/unknown").unwrap().unwrap(),
            Operation::Gravity(Gravity::NorthWest)
        );
        assert_eq!(
            coerce("gravity", "/gravity/Center").unwrap().unwrap(),
            Operation::Gravity(Gravity::Center)
        );
    }

    #[test]
    fn test_geometry_rules() {
        assert_eq!(
            coerce("crop", "/crop/100x50+10+20").unwrap().unwrap(),
            Operation::Crop(Geometry::new(100, 50, 10, 20))
        );
        assert_eq!(
            coerce("gaussian", "/gaussian/3x2").unwrap().unwrap(),
            Operation::Gaussian { radius: 3, sigma: 2 }
        );
        assert_eq!(
            coerce("rotate", "/rotate/red+90").unwrap().unwrap(),
            Operation::Rotate {
                background: "red".to_string(),
                degrees: 90
            }
        );
        assert!(coerce("rotate", "/rotate/90").unwrap().is_err());
    }

    #[test]
    fn test_dissolve_alias_and_range() {
        assert_eq!(coerce("dissolve", "/disolve/40").unwrap().unwrap(), Operation::Dissolve(40));
        assert_eq!(coerce("dissolve", "/dissolve/100").unwrap().unwrap(), Operation::Dissolve(100));
        assert!(coerce("dissolve", "/dissolve/101").unwrap().is_err());
    }

    #[test]
    fn test_sepia_maps_to_threshold_operation() {
        assert_eq!(coerce("sepia", "/sepia/80").unwrap().unwrap(), Operation::Sepia(80));
    }

    #[test]
    fn test_empty_color_is_rejected() {
        assert!(coerce("borderColor", "/borderColor//").unwrap().is_err());
    }
}
