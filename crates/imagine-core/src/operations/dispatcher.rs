//! Operation dispatcher
//!
//! Runs every grammar rule against an operation string and invokes the
//! matching capabilities on an image handle, in grammar declaration order
//! (not the order operations appear in the path).

use super::grammar::OperationGrammar;
use super::Operation;
use crate::error::OperationError;
use crate::handle::ImageHandle;

/// Applies operation strings to image handles.
#[derive(Debug, Clone, Copy)]
pub struct OperationDispatcher {
    grammar: &'static OperationGrammar,
}

impl Default for OperationDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl OperationDispatcher {
    pub fn new() -> Self {
        Self {
            grammar: OperationGrammar::global(),
        }
    }

    /// Parse an operation string into typed operations.
    ///
    /// Every rule is tried; all matches are returned in grammar order. The
    /// first coercion failure aborts parsing.
    pub fn parse(&self, operations: &str) -> Result<Vec<Operation>, OperationError> {
        let mut parsed = Vec::new();

        for rule in self.grammar.rules() {
            if let Some(matched) = rule.matches(operations) {
                parsed.push(rule.coerce(&matched)?);
            }
        }

        Ok(parsed)
    }

    /// Apply an operation string to `handle`.
    ///
    /// The whole string is coerced before the first capability is invoked, so
    /// an invalid argument leaves the handle untouched. Returns the number of
    /// operations applied.
    pub fn apply<H>(&self, operations: &str, handle: &mut H) -> Result<usize, OperationError>
    where
        H: ImageHandle + ?Sized,
    {
        let parsed = self.parse(operations)?;

        for operation in &parsed {
            tracing::debug!(operation = ?operation, "Applying image operation");
            operation.apply_to(handle)?;
        }

        Ok(parsed.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use crate::handle::{EncodedImage, HandleResult};
    use crate::operations::{Dimensions, FrameGeometry, Geometry, Gravity, ResizeGeometry};
    use bytes::Bytes;

    /// Records every capability call as a string.
    #[derive(Default)]
    struct RecordingHandle {
        calls: Vec<String>,
        fail_on: Option<&'static str>,
        released: usize,
    }

    impl RecordingHandle {
        fn record(&mut self, call: String) -> HandleResult {
            if let Some(fail) = self.fail_on {
                if call.starts_with(fail) {
                    return Err(BackendError::Decode("forced failure".to_string()));
                }
            }
            self.calls.push(call);
            Ok(())
        }
    }

    impl ImageHandle for RecordingHandle {
        fn antialias(&mut self, enabled: bool) -> HandleResult {
            self.record(format!("antialias({enabled})"))
        }
        fn auto_orient(&mut self) -> HandleResult {
            self.record("auto_orient".into())
        }
        fn backdrop(&mut self) -> HandleResult {
            self.record("backdrop".into())
        }
        fn blur(&mut self, radius: u32) -> HandleResult {
            self.record(format!("blur({radius})"))
        }
        fn border(&mut self, size: Dimensions) -> HandleResult {
            self.record(format!("border({size})"))
        }
        fn border_color(&mut self, color: &str) -> HandleResult {
            self.record(format!("border_color({color})"))
        }
        fn box_color(&mut self, color: &str) -> HandleResult {
            self.record(format!("box_color({color})"))
        }
        fn charcoal(&mut self, factor: u32) -> HandleResult {
            self.record(format!("charcoal({factor})"))
        }
        fn chop(&mut self, region: Geometry) -> HandleResult {
            self.record(format!("chop({region})"))
        }
        fn colors(&mut self, count: u32) -> HandleResult {
            self.record(format!("colors({count})"))
        }
        fn colorspace(&mut self, name: &str) -> HandleResult {
            self.record(format!("colorspace({name})"))
        }
        fn compress(&mut self, kind: &str) -> HandleResult {
            self.record(format!("compress({kind})"))
        }
        fn comment(&mut self, text: &str) -> HandleResult {
            self.record(format!("comment({text})"))
        }
        fn contrast(&mut self, multiplier: i32) -> HandleResult {
            self.record(format!("contrast({multiplier})"))
        }
        fn crop(&mut self, region: Geometry) -> HandleResult {
            self.record(format!("crop({region})"))
        }
        fn dissolve(&mut self, percent: u32) -> HandleResult {
            self.record(format!("dissolve({percent})"))
        }
        fn dither(&mut self, enabled: bool) -> HandleResult {
            self.record(format!("dither({enabled})"))
        }
        fn emboss(&mut self, radius: u32) -> HandleResult {
            self.record(format!("emboss({radius})"))
        }
        fn enhance(&mut self) -> HandleResult {
            self.record("enhance".into())
        }
        fn equalize(&mut self) -> HandleResult {
            self.record("equalize".into())
        }
        fn extent(&mut self, size: Dimensions) -> HandleResult {
            self.record(format!("extent({size})"))
        }
        fn filter(&mut self, name: &str) -> HandleResult {
            self.record(format!("filter({name})"))
        }
        fn flip(&mut self) -> HandleResult {
            self.record("flip".into())
        }
        fn flop(&mut self) -> HandleResult {
            self.record("flop".into())
        }
        fn foreground(&mut self, color: &str) -> HandleResult {
            self.record(format!("foreground({color})"))
        }
        fn frame(&mut self, frame: FrameGeometry) -> HandleResult {
            self.record(format!("frame({frame})"))
        }
        fn gaussian(&mut self, radius: u32, sigma: u32) -> HandleResult {
            self.record(format!("gaussian({radius}, {sigma})"))
        }
        fn gravity(&mut self, gravity: Gravity) -> HandleResult {
            self.record(format!("gravity({gravity})"))
        }
        fn implode(&mut self, factor: u32) -> HandleResult {
            self.record(format!("implode({factor})"))
        }
        fn lower(&mut self, size: Dimensions) -> HandleResult {
            self.record(format!("lower({size})"))
        }
        fn matte_color(&mut self, color: &str) -> HandleResult {
            self.record(format!("matte_color({color})"))
        }
        fn monochrome(&mut self) -> HandleResult {
            self.record("monochrome".into())
        }
        fn negative(&mut self) -> HandleResult {
            self.record("negative".into())
        }
        fn normalize(&mut self) -> HandleResult {
            self.record("normalize".into())
        }
        fn paint(&mut self, radius: u32) -> HandleResult {
            self.record(format!("paint({radius})"))
        }
        fn quality(&mut self, quality: u32) -> HandleResult {
            self.record(format!("quality({quality})"))
        }
        fn resize(&mut self, geometry: &ResizeGeometry) -> HandleResult {
            self.record(format!(
                "resize({}, {}, {:?})",
                geometry.width, geometry.height, geometry.options
            ))
        }
        fn rotate(&mut self, background: &str, degrees: i32) -> HandleResult {
            self.record(format!("rotate({background}, {degrees})"))
        }
        fn scale(&mut self, size: Dimensions) -> HandleResult {
            self.record(format!("scale({size})"))
        }
        fn shadow(&mut self, opacity: u32, sigma: u32) -> HandleResult {
            self.record(format!("shadow({opacity}, {sigma})"))
        }
        fn solarize(&mut self, threshold: u32) -> HandleResult {
            self.record(format!("solarize({threshold})"))
        }
        fn swirl(&mut self, degrees: u32) -> HandleResult {
            self.record(format!("swirl({degrees})"))
        }
        fn threshold(&mut self, threshold: u32) -> HandleResult {
            self.record(format!("threshold({threshold})"))
        }
        fn trim(&mut self) -> HandleResult {
            self.record("trim".into())
        }
        fn to_bytes(&mut self) -> HandleResult<EncodedImage> {
            Ok(EncodedImage {
                data: Bytes::new(),
                content_type: "application/octet-stream".to_string(),
            })
        }
        fn release(&mut self) {
            self.released += 1;
        }
    }

    fn apply(operations: &str) -> (Result<usize, OperationError>, RecordingHandle) {
        let mut handle = RecordingHandle::default();
        let result = OperationDispatcher::new().apply(operations, &mut handle);
        (result, handle)
    }

    #[test]
    fn test_single_operation_invoked_once() {
        let (result, handle) = apply("/resize/200x200");
        assert_eq!(result.unwrap(), 1);
        assert_eq!(handle.calls, vec!["resize(200, 200, None)"]);
    }

    #[test]
    fn test_multiple_operations_follow_grammar_order() {
        let (_, in_order) = apply("/resize/200x200/blur/4");
        let (_, reversed) = apply("/blur/4/resize/200x200");
        assert_eq!(in_order.calls, vec!["blur(4)", "resize(200, 200, None)"]);
        assert_eq!(reversed.calls, in_order.calls);
    }

    #[test]
    fn test_full_pipeline() {
        let (result, handle) = apply("/resize/200x200/blur/4/gravity/center");
        assert_eq!(result.unwrap(), 3);
        assert_eq!(
            handle.calls,
            vec!["blur(4)", "gravity(Center)", "resize(200, 200, None)"]
        );
    }

    #[test]
    fn test_unknown_gravity_defaults_to_northwest() {
        let (result, handle) = apply("/gravity/unknown");
        assert!(result.is_ok());
        assert_eq!(handle.calls, vec!["gravity(NorthWest)"]);
    }

    #[test]
    fn test_antialias_coercion() {
        assert_eq!(apply("/antialias/true").1.calls, vec!["antialias(true)"]);
        assert_eq!(apply("/antialias/false").1.calls, vec!["antialias(false)"]);
        assert_eq!(apply("/antialias/1").1.calls, vec!["antialias(false)"]);
    }

    #[test]
    fn test_invalid_argument_leaves_handle_untouched() {
        let (result, handle) = apply("/blur/4/resize/abcx200");
        assert!(matches!(
            result,
            Err(OperationError::InvalidOperationArgument {
                operation: "resize",
                ..
            })
        ));
        assert!(handle.calls.is_empty());
    }

    #[test]
    fn test_no_recognised_keywords() {
        let (result, handle) = apply("/nothing/here");
        assert_eq!(result.unwrap(), 0);
        assert!(handle.calls.is_empty());
    }

    #[test]
    fn test_sepia_invokes_threshold() {
        let (_, handle) = apply("/sepia/50");
        assert_eq!(handle.calls, vec!["threshold(50)"]);
    }

    #[test]
    fn test_resize_options_passthrough() {
        let (_, handle) = apply("/resize/200x100!");
        assert_eq!(handle.calls, vec!["resize(200, 100, Some(\"!\"))"]);
    }

    #[test]
    fn test_backend_failure_stops_pipeline() {
        let mut handle = RecordingHandle {
            fail_on: Some("gravity"),
            ..Default::default()
        };
        let result = OperationDispatcher::new().apply("/blur/2/gravity/east/trim", &mut handle);
        assert!(matches!(result, Err(OperationError::Backend(_))));
        assert_eq!(handle.calls, vec!["blur(2)"]);
        assert_eq!(handle.released, 0);
    }

    #[test]
    fn test_parse_returns_typed_operations() {
        let ops = OperationDispatcher::new()
            .parse("/flop/crop/10x10+1+2/quality/80")
            .unwrap();
        assert_eq!(
            ops,
            vec![
                Operation::Crop(Geometry::new(10, 10, 1, 2)),
                Operation::Flop,
                Operation::Quality(80),
            ]
        );
    }
}
