//! Field transformation pipelines.
//!
//! [`build_pipeline`] turns an immutable [`PipelineConfig`] into an ordered,
//! immutable [`Pipeline`]. Stage order never depends on which flags are set
//! or on the order they were given:
//!
//! collapse → normalize → vocabulary-map → conversion (join+parse or boolean) → user stages

use crate::choices::{ChoiceMatcher, Choices};
use crate::error::{DropItem, SchemaError};
use crate::transform_registry::UserStage;
use crate::value::FieldValue;

/// How many matches a field keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Multiplicity {
    /// Collapse matches to the first non-empty one
    #[default]
    Single,
    /// Keep every match, in document order
    Multi,
}

/// Per-element string normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalize {
    Strip,
    Lower,
    Upper,
}

impl Normalize {
    fn apply(self, s: &str) -> String {
        match self {
            Normalize::Strip => s.trim().to_string(),
            Normalize::Lower => s.to_lowercase(),
            Normalize::Upper => s.to_uppercase(),
        }
    }
}

/// Type conversion applied after vocabulary mapping
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Conversion {
    /// Join with "" then parse an integer
    Integer,
    /// Join with "" then parse a float, reading `delimiter` as the decimal point
    Float { delimiter: char },
    /// Truthiness of the value
    Boolean,
}

/// Flags a pipeline is assembled from
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub multiplicity: Multiplicity,
    pub strip: bool,
    pub lower: bool,
    pub upper: bool,
    pub choices: Option<Choices>,
    pub multi_choices: bool,
    pub conversion: Option<Conversion>,
    pub extra_stages: Vec<UserStage>,
}

/// One transformation step
#[derive(Debug, Clone)]
pub enum Stage {
    Collapse,
    Normalize(Vec<Normalize>),
    MapChoices(ChoiceMatcher),
    Join(String),
    ParseInt,
    ParseFloat { delimiter: char },
    Truthiness,
    User(UserStage),
}

/// Stage kinds, for inspecting pipeline order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    Collapse,
    Normalize,
    MapChoices,
    Join,
    Parse,
    Coerce,
    User,
}

impl Stage {
    pub fn kind(&self) -> StageKind {
        match self {
            Stage::Collapse => StageKind::Collapse,
            Stage::Normalize(_) => StageKind::Normalize,
            Stage::MapChoices(_) => StageKind::MapChoices,
            Stage::Join(_) => StageKind::Join,
            Stage::ParseInt | Stage::ParseFloat { .. } => StageKind::Parse,
            Stage::Truthiness => StageKind::Coerce,
            Stage::User(_) => StageKind::User,
        }
    }

    fn apply(&self, value: FieldValue, ctx: &StageContext<'_>) -> Result<FieldValue, DropItem> {
        match self {
            Stage::Collapse => Ok(take_first(value)),
            Stage::Normalize(ops) => map_elements(value, |element| {
                Ok(match element {
                    FieldValue::String(s) => {
                        FieldValue::String(ops.iter().fold(s, |acc, op| op.apply(&acc)))
                    }
                    other => other,
                })
            }),
            Stage::MapChoices(matcher) => {
                map_elements(value, |element| matcher.resolve(&element, ctx.field, ctx.default))
            }
            Stage::Join(separator) => Ok(join(value, separator)),
            Stage::ParseInt => parse_number(value, ctx, "int", parse_int),
            Stage::ParseFloat { delimiter } => parse_number(value, ctx, "float", |text| {
                let text = if *delimiter == '.' {
                    text.to_string()
                } else {
                    text.replace(*delimiter, ".")
                };
                text.parse::<f64>().ok().map(FieldValue::Float)
            }),
            Stage::Truthiness => Ok(FieldValue::Bool(value.is_truthy())),
            Stage::User(stage) => stage.apply(value).map_err(|reason| DropItem::Rejected {
                field: ctx.field.to_string(),
                reason,
            }),
        }
    }
}

/// Field facts stages need while running
#[derive(Debug, Clone, Copy)]
pub struct StageContext<'a> {
    pub field: &'a str,
    pub default: Option<&'a FieldValue>,
}

/// Ordered, immutable sequence of stages
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn kinds(&self) -> Vec<StageKind> {
        self.stages.iter().map(Stage::kind).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Thread raw matches through every stage.
    ///
    /// A stage producing `Null` ends the chain; the first failing stage
    /// drops the record.
    pub fn run(&self, matches: Vec<String>, ctx: &StageContext<'_>) -> Result<FieldValue, DropItem> {
        let mut value = FieldValue::strings(matches);
        for stage in &self.stages {
            if value.is_null() {
                break;
            }
            value = stage.apply(value, ctx)?;
        }
        Ok(value)
    }
}

/// Assemble the stages for `config`.
///
/// Fails with `ConflictingOption` when both `lower` and `upper` are set, or
/// when `multi_choices` is set without `choices`. An empty vocabulary counts
/// as no vocabulary.
pub fn build_pipeline(config: &PipelineConfig) -> Result<Pipeline, SchemaError> {
    let choices = config.choices.as_ref().filter(|c| !c.is_empty());

    if config.lower && config.upper {
        return Err(SchemaError::ConflictingOption(
            "set lower or upper, not both".to_string(),
        ));
    }
    if config.multi_choices && choices.is_none() {
        return Err(SchemaError::ConflictingOption(
            "multi_choices can be used with choices only".to_string(),
        ));
    }

    let mut stages = Vec::new();

    if config.multiplicity == Multiplicity::Single {
        stages.push(Stage::Collapse);
    }

    let mut ops = Vec::new();
    if config.strip {
        ops.push(Normalize::Strip);
    }
    if config.lower {
        ops.push(Normalize::Lower);
    } else if config.upper {
        ops.push(Normalize::Upper);
    }
    if !ops.is_empty() {
        stages.push(Stage::Normalize(ops));
    }

    if let Some(choices) = choices {
        stages.push(Stage::MapChoices(ChoiceMatcher::new(
            choices.clone(),
            config.multi_choices,
        )?));
    }

    match config.conversion {
        Some(Conversion::Integer) => {
            stages.push(Stage::Join(String::new()));
            stages.push(Stage::ParseInt);
        }
        Some(Conversion::Float { delimiter }) => {
            stages.push(Stage::Join(String::new()));
            stages.push(Stage::ParseFloat { delimiter });
        }
        Some(Conversion::Boolean) => stages.push(Stage::Truthiness),
        None => {}
    }

    stages.extend(config.extra_stages.iter().cloned().map(Stage::User));

    Ok(Pipeline { stages })
}

/// First element that is neither null nor an empty string
fn take_first(value: FieldValue) -> FieldValue {
    match value {
        FieldValue::List(items) => items
            .into_iter()
            .find(|v| !v.is_null() && v.as_str() != Some(""))
            .unwrap_or(FieldValue::Null),
        other => other,
    }
}

/// Apply `f` to each element of a list (flattening list results and dropping
/// nulls), or to a scalar directly
fn map_elements<F>(value: FieldValue, mut f: F) -> Result<FieldValue, DropItem>
where
    F: FnMut(FieldValue) -> Result<FieldValue, DropItem>,
{
    match value {
        FieldValue::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match f(item)? {
                    FieldValue::Null => {}
                    FieldValue::List(inner) => out.extend(inner),
                    other => out.push(other),
                }
            }
            Ok(FieldValue::List(out))
        }
        scalar => f(scalar),
    }
}

fn join(value: FieldValue, separator: &str) -> FieldValue {
    match value {
        FieldValue::List(items) => FieldValue::String(
            items
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(separator),
        ),
        FieldValue::String(s) => FieldValue::String(s),
        other => FieldValue::String(other.to_string()),
    }
}

fn parse_number<F>(
    value: FieldValue,
    ctx: &StageContext<'_>,
    expected: &'static str,
    parse: F,
) -> Result<FieldValue, DropItem>
where
    F: Fn(&str) -> Option<FieldValue>,
{
    let raw = match value {
        FieldValue::String(s) => s,
        other => other.to_string(),
    };
    let text = raw.trim();

    if text.is_empty() {
        return Ok(ctx.default.cloned().unwrap_or(FieldValue::Null));
    }

    parse(text).ok_or_else(|| DropItem::TypeMismatch {
        field: ctx.field.to_string(),
        expected,
        value: raw.clone(),
    })
}

/// Integer literal, including exponential integers such as `12e+3`
fn parse_int(text: &str) -> Option<FieldValue> {
    if let Ok(i) = text.parse::<i64>() {
        return Some(FieldValue::Int(i));
    }

    let (mantissa, exponent) = text.split_once(['e', 'E'])?;
    let mantissa: i64 = mantissa.parse().ok()?;
    let exponent: u32 = exponent.strip_prefix('+').unwrap_or(exponent).parse().ok()?;
    let scale = 10i64.checked_pow(exponent)?;
    mantissa.checked_mul(scale).map(FieldValue::Int)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn ctx<'a>(default: Option<&'a FieldValue>) -> StageContext<'a> {
        StageContext {
            field: "test_field",
            default,
        }
    }

    fn noop() -> UserStage {
        UserStage::new("noop", |v: FieldValue| -> Result<FieldValue, String> { Ok(v) })
    }

    #[test]
    fn test_full_stage_order() {
        let config = PipelineConfig {
            extra_stages: vec![noop(), noop()],
            conversion: Some(Conversion::Integer),
            choices: Some(Choices::tags(["1", "2"])),
            upper: true,
            strip: true,
            multiplicity: Multiplicity::Single,
            ..Default::default()
        };
        let pipeline = build_pipeline(&config).unwrap();

        assert_eq!(
            pipeline.kinds(),
            vec![
                StageKind::Collapse,
                StageKind::Normalize,
                StageKind::MapChoices,
                StageKind::Join,
                StageKind::Parse,
                StageKind::User,
                StageKind::User,
            ]
        );
    }

    #[test]
    fn test_every_flag_subset_keeps_order() {
        let rank = |kind: StageKind| match kind {
            StageKind::Collapse => 0,
            StageKind::Normalize => 1,
            StageKind::MapChoices => 2,
            StageKind::Join | StageKind::Parse | StageKind::Coerce => 3,
            StageKind::User => 4,
        };

        for mask in 0u32..256 {
            let bit = |n: u32| mask & (1 << n) != 0;
            let config = PipelineConfig {
                multiplicity: if bit(0) { Multiplicity::Single } else { Multiplicity::Multi },
                strip: bit(1),
                lower: bit(2),
                choices: bit(3).then(|| Choices::tags(["x"])),
                conversion: bit(4).then_some(Conversion::Float { delimiter: ',' }),
                extra_stages: if bit(5) { vec![noop()] } else { vec![] },
                upper: bit(6),
                multi_choices: bit(7),
            };

            let conflicting = (bit(2) && bit(6)) || (bit(7) && !bit(3));
            let kinds = match build_pipeline(&config) {
                Err(SchemaError::ConflictingOption(_)) => {
                    assert!(conflicting, "mask {:08b} rejected", mask);
                    continue;
                }
                Err(e) => panic!("mask {:08b}: unexpected error {}", mask, e),
                Ok(pipeline) => {
                    assert!(!conflicting, "mask {:08b} accepted", mask);
                    pipeline.kinds()
                }
            };
            let ranks: Vec<_> = kinds.iter().map(|k| rank(*k)).collect();

            assert!(ranks.windows(2).all(|w| w[0] <= w[1]), "mask {:08b}: {:?}", mask, kinds);
            assert_eq!(kinds.contains(&StageKind::Collapse), bit(0));
            assert_eq!(kinds.contains(&StageKind::Normalize), bit(1) || bit(2) || bit(6));
            assert_eq!(kinds.contains(&StageKind::MapChoices), bit(3));
            assert_eq!(kinds.contains(&StageKind::Parse), bit(4));
            assert_eq!(kinds.contains(&StageKind::User), bit(5));
        }
    }

    #[test]
    fn test_empty_choices_count_as_none() {
        let multi_on_empty = PipelineConfig {
            choices: Some(Choices::tags(Vec::<String>::new())),
            multi_choices: true,
            ..Default::default()
        };
        assert!(matches!(
            build_pipeline(&multi_on_empty),
            Err(SchemaError::ConflictingOption(_))
        ));

        let empty_mapping = PipelineConfig {
            choices: Some(Choices::Mapping(IndexMap::new())),
            strip: true,
            ..Default::default()
        };
        let pipeline = build_pipeline(&empty_mapping).unwrap();
        assert_eq!(pipeline.kinds(), vec![StageKind::Collapse, StageKind::Normalize]);

        let value = pipeline.run(vec![" hello ".to_string()], &ctx(None)).unwrap();
        assert_eq!(value, FieldValue::from("hello"));
    }

    #[test]
    fn test_conflicting_options() {
        let both = PipelineConfig {
            lower: true,
            upper: true,
            ..Default::default()
        };
        assert!(matches!(build_pipeline(&both), Err(SchemaError::ConflictingOption(_))));

        let multi_without_choices = PipelineConfig {
            multi_choices: true,
            ..Default::default()
        };
        assert!(matches!(
            build_pipeline(&multi_without_choices),
            Err(SchemaError::ConflictingOption(_))
        ));

        let fine = PipelineConfig {
            lower: true,
            multi_choices: true,
            choices: Some(Choices::tags(["a"])),
            ..Default::default()
        };
        assert!(build_pipeline(&fine).is_ok());
    }

    #[test]
    fn test_multi_without_stages_is_identity() {
        let config = PipelineConfig {
            multiplicity: Multiplicity::Multi,
            ..Default::default()
        };
        let pipeline = build_pipeline(&config).unwrap();
        assert!(pipeline.is_empty());

        let raw = vec![" b ".to_string(), "".to_string(), "a".to_string()];
        let value = pipeline.run(raw, &ctx(None)).unwrap();
        assert_eq!(value, FieldValue::strings([" b ", "", "a"]));
    }

    #[test]
    fn test_collapse_skips_empty() {
        let config = PipelineConfig::default();
        let pipeline = build_pipeline(&config).unwrap();

        let raw = vec!["".to_string(), "second".to_string()];
        assert_eq!(pipeline.run(raw, &ctx(None)).unwrap(), FieldValue::from("second"));
        assert_eq!(pipeline.run(vec![], &ctx(None)).unwrap(), FieldValue::Null);
    }

    #[test]
    fn test_null_stops_chain() {
        let config = PipelineConfig {
            extra_stages: vec![UserStage::new("fail", |_: FieldValue| -> Result<FieldValue, String> {
                Err("should not run".to_string())
            })],
            ..Default::default()
        };
        let pipeline = build_pipeline(&config).unwrap();

        assert_eq!(pipeline.run(vec![], &ctx(None)).unwrap(), FieldValue::Null);
    }

    #[test]
    fn test_normalize_per_element() {
        let config = PipelineConfig {
            multiplicity: Multiplicity::Multi,
            strip: true,
            upper: true,
            ..Default::default()
        };
        let pipeline = build_pipeline(&config).unwrap();
        let raw = vec![" mon ".to_string(), "tue".to_string()];

        assert_eq!(pipeline.run(raw, &ctx(None)).unwrap(), FieldValue::strings(["MON", "TUE"]));
    }

    #[test]
    fn test_choices_flatten_across_matches() {
        let config = PipelineConfig {
            multiplicity: Multiplicity::Multi,
            choices: Some(Choices::mapping([
                ("microwave", vec!["kitchen", "microwave"]),
                ("shower", vec!["bathroom", "shower"]),
            ])),
            ..Default::default()
        };
        let pipeline = build_pipeline(&config).unwrap();
        let raw = vec!["a microwave".to_string(), "one shower".to_string()];

        assert_eq!(
            pipeline.run(raw, &ctx(None)).unwrap(),
            FieldValue::strings(["kitchen", "microwave", "bathroom", "shower"])
        );
    }

    #[test]
    fn test_parse_int() {
        let config = PipelineConfig {
            strip: true,
            conversion: Some(Conversion::Integer),
            ..Default::default()
        };
        let pipeline = build_pipeline(&config).unwrap();
        let zero = FieldValue::Int(0);

        assert_eq!(pipeline.run(vec!["123".into()], &ctx(Some(&zero))).unwrap(), FieldValue::Int(123));
        assert_eq!(pipeline.run(vec!["-7".into()], &ctx(None)).unwrap(), FieldValue::Int(-7));
        assert_eq!(pipeline.run(vec!["12e+3".into()], &ctx(None)).unwrap(), FieldValue::Int(12000));
        assert_eq!(pipeline.run(vec!["   ".into()], &ctx(Some(&zero))).unwrap(), FieldValue::Int(0));

        let err = pipeline.run(vec!["hello".into()], &ctx(Some(&zero))).unwrap_err();
        assert_eq!(err.to_string(), "\"test_field\": int expected, not \"hello\"");

        assert!(pipeline.run(vec!["9e+30".into()], &ctx(None)).is_err());
    }

    #[test]
    fn test_join_before_parse() {
        let config = PipelineConfig {
            multiplicity: Multiplicity::Multi,
            conversion: Some(Conversion::Integer),
            ..Default::default()
        };
        let pipeline = build_pipeline(&config).unwrap();
        let zero = FieldValue::Int(0);

        let raw = vec!["1".to_string(), "250".to_string()];
        assert_eq!(pipeline.run(raw, &ctx(None)).unwrap(), FieldValue::Int(1250));
        assert_eq!(pipeline.run(vec![], &ctx(Some(&zero))).unwrap(), FieldValue::Int(0));
        assert_eq!(pipeline.run(vec![], &ctx(None)).unwrap(), FieldValue::Null);
    }

    #[test]
    fn test_parse_float_delimiter() {
        let config = PipelineConfig {
            conversion: Some(Conversion::Float { delimiter: ',' }),
            ..Default::default()
        };
        let pipeline = build_pipeline(&config).unwrap();

        assert_eq!(pipeline.run(vec!["2,75".into()], &ctx(None)).unwrap(), FieldValue::Float(2.75));

        let err = pipeline.run(vec!["hello".into()], &ctx(None)).unwrap_err();
        assert_eq!(err.to_string(), "\"test_field\": float expected, not \"hello\"");
    }

    #[test]
    fn test_truthiness_stage() {
        let config = PipelineConfig {
            conversion: Some(Conversion::Boolean),
            ..Default::default()
        };
        let pipeline = build_pipeline(&config).unwrap();

        assert_eq!(pipeline.run(vec!["yes".into()], &ctx(None)).unwrap(), FieldValue::Bool(true));
        assert_eq!(pipeline.run(vec![], &ctx(None)).unwrap(), FieldValue::Null);
    }

    #[test]
    fn test_user_stage_rejection() {
        let config = PipelineConfig {
            extra_stages: vec![UserStage::new("reject", |v: FieldValue| -> Result<FieldValue, String> {
                Err(format!("unexpected {}", v))
            })],
            ..Default::default()
        };
        let pipeline = build_pipeline(&config).unwrap();
        let err = pipeline.run(vec!["x".into()], &ctx(None)).unwrap_err();

        assert_eq!(
            err,
            DropItem::Rejected {
                field: "test_field".to_string(),
                reason: "unexpected x".to_string(),
            }
        );
    }
}
