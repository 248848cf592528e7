mod common;

use common::{solid_image, BlockRenderer};
use glyphgrid::{
    render_variant, search_best, GlyphgridError, ParameterVariant, SearchSpace, Shape, Shift,
};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn space(scales: &[f32], strokes: &[u32], shifts: &[isize]) -> SearchSpace {
    SearchSpace {
        scales: scales.to_vec(),
        strokes: strokes.to_vec(),
        shifts: shifts.to_vec(),
    }
}

#[test]
fn lower_scoring_variant_wins() {
    let image = solid_image(16, 16, 0);
    let chars: Vec<char> = " #".chars().collect();
    let result = search_best(
        &BlockRenderer::default(),
        image.view(),
        8,
        2.0,
        &chars,
        &space(&[0.5, 1.0], &[0], &[0]),
    )
    .unwrap();
    assert_eq!(result.evaluated, 2);
    assert!(result.skipped.is_empty());
    assert_eq!(result.best.variant.scale, 1.0);
    assert_eq!(result.best.rows, vec!["##".to_string()]);
    assert_eq!(result.best.total_score, 0.0);
}

#[test]
fn search_agrees_with_single_variant_runs() {
    let mut rng = StdRng::seed_from_u64(42);
    let image = Array2::from_shape_fn((30, 41), |_| if rng.random::<bool>() { 0u8 } else { 255 });
    let chars: Vec<char> = " .-#".chars().collect();
    let renderer = BlockRenderer::default();
    let space = space(&[0.8, 1.0, 1.3], &[0, 1], &[0, 2]);
    let aspect = 2.0;

    let result = search_best(&renderer, image.view(), 6, aspect, &chars, &space).unwrap();
    let step = Shape::from_aspect(6, aspect).unwrap();
    let variants = space.variants(aspect);
    assert_eq!(result.evaluated, variants.len());

    let mut best: Option<glyphgrid::Evaluation> = None;
    for variant in variants {
        let eval = render_variant(&renderer, image.view(), step, &chars, variant).unwrap();
        if best.as_ref().map_or(true, |b| eval.mean_score < b.mean_score) {
            best = Some(eval);
        }
    }
    assert_eq!(Some(result.best), best);
}

#[test]
fn unrenderable_styles_are_skipped() {
    let image = solid_image(16, 16, 0);
    let chars: Vec<char> = " #".chars().collect();
    let renderer = BlockRenderer { max_px: 10.0 };
    let space = space(&[0.5, 1.0, 2.0], &[0], &[0, 2]);
    let result = search_best(&renderer, image.view(), 8, 2.0, &chars, &space).unwrap();
    assert_eq!(result.best.variant.scale, 0.5);
    assert_eq!(result.evaluated, 4);
    assert_eq!(result.skipped.len(), 8);
    assert!(result.skipped.iter().all(|v| v.scale > 0.5));
}

#[test]
fn every_variant_failing_is_fatal() {
    let image = solid_image(16, 16, 0);
    let chars: Vec<char> = " #".chars().collect();
    let renderer = BlockRenderer { max_px: 1.0 };
    let space = space(&[0.5, 1.0], &[0, 1], &[0, 2]);
    match search_best(&renderer, image.view(), 8, 2.0, &chars, &space) {
        Err(GlyphgridError::AllVariantsFailed { attempted }) => {
            assert_eq!(attempted, space.variants(2.0));
        }
        other => panic!("expected AllVariantsFailed, got {other:?}"),
    }
}

#[test]
fn equal_scores_go_to_canonical_first() {
    let image = solid_image(20, 20, 255);
    let chars: Vec<char> = " #".chars().collect();
    let result = search_best(
        &BlockRenderer::default(),
        image.view(),
        4,
        2.0,
        &chars,
        &space(&[1.0, 1.1], &[0, 1], &[4, 0]),
    )
    .unwrap();
    assert_eq!(result.best.total_score, 0.0);
    let first = ParameterVariant {
        scale: 1.0,
        stroke: 0,
        shift: Shift::new(4, 8),
    };
    assert_eq!(result.best.variant, first);
}

#[test]
fn empty_charset_is_not_absorbed() {
    let image = solid_image(8, 8, 0);
    let renderer = BlockRenderer::default();
    let err = search_best(&renderer, image.view(), 4, 2.0, &[], &SearchSpace::default());
    assert!(matches!(err, Err(GlyphgridError::EmptyCharset)));
}

#[test]
fn evaluation_errors_name_the_variant() {
    let image = solid_image(0, 8, 0);
    let chars: Vec<char> = " #".chars().collect();
    let space = space(&[1.0], &[0, 1], &[0, 2]);
    match search_best(&BlockRenderer::default(), image.view(), 4, 2.0, &chars, &space) {
        Err(GlyphgridError::Variant { variant, source }) => {
            assert!(space.variants(2.0).contains(&variant));
            assert!(matches!(*source, GlyphgridError::InvalidGeometry(_)));
        }
        other => panic!("expected Variant, got {other:?}"),
    }
}
