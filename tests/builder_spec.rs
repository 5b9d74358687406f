use autoedit::{
    AutoEditError, AutoEditResult, HashMethod, MatchMethod, MatchResult, Matcher, MatcherBuilder,
    MatcherConfig, MatcherSpec, ParamValue, TemplateMethod,
};
use image::{GenericImage, Rgb, RgbImage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn scene() -> (RgbImage, RgbImage) {
    let mut state = 99u32;
    let mut original = RgbImage::from_fn(120, 90, |_, _| {
        state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        let v = (state >> 24) as u8;
        Rgb([v, v / 2, 255 - v])
    });
    let target = RgbImage::from_fn(32, 24, |x, y| {
        let v = 128.0 + 90.0 * ((x as f32) / 4.0).sin() * ((y as f32) / 5.0).cos();
        Rgb([v as u8, 255 - v as u8, 80])
    });
    original.copy_from(&target, 40, 32).unwrap();
    (original, target)
}

fn json_round_trip(builder: &MatcherBuilder) -> MatcherBuilder {
    let (spec, config) = builder.serialize().unwrap();
    let spec_json = serde_json::to_string(&spec).unwrap();
    let config_json = serde_json::to_string(&config).unwrap();
    let spec: MatcherSpec = serde_json::from_str(&spec_json).unwrap();
    let config: MatcherConfig = serde_json::from_str(&config_json).unwrap();
    MatcherBuilder::deserialize(&spec, config).unwrap()
}

#[test]
fn every_kind_survives_a_json_round_trip() {
    let (original, target) = scene();
    let builders = [
        MatcherBuilder::new()
            .template(0.9, TemplateMethod::CcoeffNormed)
            .unwrap(),
        MatcherBuilder::new()
            .hash_with(0.8, HashMethod::PHash, 6, 0.5)
            .unwrap()
            .except_overlap(false),
        MatcherBuilder::new().sift_with(0.8, 4).unwrap(),
    ];

    for builder in builders {
        let rebuilt = json_round_trip(&builder);
        assert_eq!(builder.serialize().unwrap(), rebuilt.serialize().unwrap());
        assert_eq!(
            builder.match_pair(&original, &target),
            rebuilt.match_pair(&original, &target)
        );
    }
}

#[test]
fn descriptor_json_uses_kind_tags() {
    let builder = MatcherBuilder::new()
        .template(0.5, TemplateMethod::SqdiffNormed)
        .unwrap()
        .hash(0.95, HashMethod::DHash)
        .unwrap()
        .sift(0.75)
        .unwrap();
    let (spec, _) = builder.serialize().unwrap();
    let value = serde_json::to_value(&spec).unwrap();

    assert_eq!(value["version"], 1);
    assert_eq!(value["items"][0][0], "tm");
    assert_eq!(value["items"][0][1]["method"], "TM_SQDIFF_NORMED");
    assert_eq!(value["items"][0][1]["threshold"], 0.5);
    assert_eq!(value["items"][1][1]["threshold"], 0.95);
    assert_eq!(value["items"][1][0], "hash");
    assert_eq!(value["items"][1][1]["method"], "DHASH");
    assert_eq!(value["items"][1][1]["hash_size"], 8);
    assert_eq!(value["items"][2][0], "sift");
    assert_eq!(value["items"][2][1]["min_match_count"], 10);
    assert_eq!(value["items"][2][1]["knn_index"], 2);
}

#[test]
fn decimal_thresholds_are_serialized_exactly() {
    let builder = MatcherBuilder::new()
        .template(0.9, TemplateMethod::CcorrNormed)
        .unwrap()
        .hash_with(0.85, HashMethod::AHash, 8, 0.21)
        .unwrap()
        .sift(0.7)
        .unwrap();
    let (spec, _) = builder.serialize().unwrap();
    let json = serde_json::to_string(&spec).unwrap();

    assert!(json.contains(r#""threshold":0.9"#), "{json}");
    assert!(json.contains(r#""threshold":0.85"#), "{json}");
    assert!(json.contains(r#""stride_ratio":0.21"#), "{json}");
    assert!(json.contains(r#""threshold":0.7"#), "{json}");
    assert_eq!(json_round_trip(&builder).serialize().unwrap(), (spec, MatcherConfig::default()));
}

#[test]
fn sift_item_without_knn_index_defaults_to_two() {
    let spec: MatcherSpec = serde_json::from_str(
        r#"{"version": 1, "items": [["sift", {"threshold": 0.7, "min_match_count": 8}]]}"#,
    )
    .unwrap();
    let builder = MatcherBuilder::deserialize(&spec, MatcherConfig::default()).unwrap();
    let (rebuilt, _) = builder.serialize().unwrap();
    assert_eq!(rebuilt.items[0].params()["knn_index"], ParamValue::Int(2));
}

#[test]
fn unsupported_version_is_rejected() {
    let spec: MatcherSpec = serde_json::from_str(r#"{"version": 2, "items": []}"#).unwrap();
    let err = MatcherBuilder::deserialize(&spec, MatcherConfig::default()).unwrap_err();
    assert_eq!(err, AutoEditError::UnsupportedSpecVersion(2));
}

#[test]
fn unknown_kind_and_bad_params_are_rejected() {
    let spec: MatcherSpec =
        serde_json::from_str(r#"{"version": 1, "items": [["orb", {}]]}"#).unwrap();
    let err = MatcherBuilder::deserialize(&spec, MatcherConfig::default()).unwrap_err();
    assert_eq!(err, AutoEditError::UnknownMatcherKind("orb".to_string()));

    let spec: MatcherSpec =
        serde_json::from_str(r#"{"version": 1, "items": [["tm", {"threshold": 0.9}]]}"#).unwrap();
    let err = MatcherBuilder::deserialize(&spec, MatcherConfig::default()).unwrap_err();
    assert!(matches!(err, AutoEditError::MalformedSpec(_)));

    let spec: MatcherSpec = serde_json::from_str(
        r#"{"version": 1, "items": [["hash", {"threshold": 0.9, "method": "XHASH", "hash_size": 8, "stride_ratio": 0.25}]]}"#,
    )
    .unwrap();
    let err = MatcherBuilder::deserialize(&spec, MatcherConfig::default()).unwrap_err();
    assert!(matches!(err, AutoEditError::InvalidMethod { kind: "hash", .. }));
}

#[test]
fn config_rejects_unknown_keys_and_fills_defaults() {
    assert!(serde_json::from_str::<MatcherConfig>(r#"{"early_stopp": true}"#).is_err());
    let cfg: MatcherConfig = serde_json::from_str(r#"{"early_stop": true}"#).unwrap();
    assert!(cfg.early_stop);
    assert!(cfg.except_overlap);
}

struct Counting {
    calls: Arc<AtomicUsize>,
    hit: bool,
}

impl Matcher for Counting {
    fn name(&self) -> String {
        "counting".to_string()
    }

    fn match_impl(
        &self,
        _original: &RgbImage,
        _target: &RgbImage,
        _cfg: &MatcherConfig,
    ) -> AutoEditResult<Vec<MatchResult>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.hit {
            Ok(vec![MatchResult::new(1, 2, 5, 5, 0.9, MatchMethod::AHash)])
        } else {
            Ok(Vec::new())
        }
    }
}

fn counting_chain(early_stop: bool) -> (MatcherBuilder, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let builder = [false, true, true]
        .into_iter()
        .fold(MatcherBuilder::new(), |b, hit| {
            b.push(Box::new(Counting {
                calls: Arc::clone(&calls),
                hit,
            }))
        })
        .early_stop(early_stop);
    (builder, calls)
}

#[test]
fn early_stop_skips_matchers_after_the_first_hit() {
    let (original, target) = scene();

    let (builder, calls) = counting_chain(true);
    let found = builder.match_pair(&original, &target);
    assert_eq!(found.len(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let (builder, calls) = counting_chain(false);
    let found = builder.match_pair(&original, &target);
    assert_eq!(found.len(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn chain_with_undescribed_matcher_cannot_serialize() {
    let (builder, _) = counting_chain(false);
    let err = builder.serialize().unwrap_err();
    assert!(matches!(err, AutoEditError::MalformedSpec(_)));
}
