mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;

use common::{gradient, grey_ramp, random_bitmap, solid};
use lib_d2::cache::{fingerprint, TextureCache};
use lib_d2::color::Color;
use lib_d2::compression::{DirectFormat, PixelDepth};
use lib_d2::matcher::MatchStrategy;
use lib_d2::pipeline::bitmap_from_rgba;
use lib_d2::quantize::QuantizeMethod;
use lib_d2::task::TaskContext;
use lib_d2::texture::Rotation;
use lib_d2::{decode, preview, PipelineError, TextureConverter, TextureFormat, TextureSettings};

#[test]
fn test_every_indexed_depth_previews_with_generated_palette() {
    let source = gradient(16, 16);
    for depth in PixelDepth::ALL {
        let settings = TextureSettings::new(TextureFormat::Indexed(depth));
        let converter = TextureConverter::from_settings(&settings);
        let (bytes, converted) = converter
            .encode_d2(&source, &settings, None, &TaskContext::new())
            .unwrap();

        let palette = converted.palette.as_ref().unwrap();
        assert_eq!(palette.len(), depth.window_size());

        let shown = preview(&bytes, None, 0).unwrap();
        assert_eq!((shown.width, shown.height), (16, 16));
        for pixel in shown.rgba.chunks_exact(4) {
            let color = Color::new(pixel[0], pixel[1], pixel[2], pixel[3]);
            assert!(palette.iter().any(|&c| c == color), "{:?}", depth);
        }
    }
}

#[test]
fn test_best_fit_with_external_palette() {
    let palette = grey_ramp(64);
    let source = solid(4, 4, Color::rgb(250, 250, 250));
    let settings = TextureSettings {
        strategy: MatchStrategy::BestFit,
        embed_palette: false,
        palette_name: Some("greys".into()),
        ..TextureSettings::new(TextureFormat::Indexed(PixelDepth::Bpp4))
    };

    let converter = TextureConverter::from_settings(&settings);
    let (bytes, converted) = converter
        .encode_d2(&source, &settings, Some(&palette), &TaskContext::new())
        .unwrap();
    assert_eq!(converted.palette_offset, 48);

    let texture = decode(&bytes).unwrap();
    assert!(texture.palette.is_none());
    assert_eq!(texture.palette_name.as_deref(), Some("greys"));

    assert!(matches!(
        preview(&bytes, None, 0),
        Err(PipelineError::Decoding(_))
    ));
    let shown = preview(&bytes, Some(&palette), converted.palette_offset).unwrap();
    assert_eq!(&shown.rgba[..4], &[250, 250, 250, 255]);
}

#[test]
fn test_direct_rotated_rle_texture() {
    let source = random_bitmap(4, 5, 3);
    let settings = TextureSettings {
        rotation: Rotation::Cw180,
        rle: true,
        ..TextureSettings::new(TextureFormat::Direct(DirectFormat::Rgb888))
    };

    let (bytes, converted) = TextureConverter::from_settings(&settings)
        .encode_d2(&source, &settings, None, &TaskContext::new())
        .unwrap();
    assert_eq!((converted.width, converted.height), (5, 3));

    let shown = preview(&bytes, None, 0).unwrap();
    assert_eq!(shown.rgba, source.rgba());
}

#[test]
fn test_sampled_quantizer_fills_palette() {
    let source = random_bitmap(8, 64, 64);
    let settings = TextureSettings {
        quantize_method: QuantizeMethod::SimpleSample,
        color_count: Some(100),
        ..TextureSettings::default()
    };
    let converted = TextureConverter::from_settings(&settings)
        .convert(&source, &settings, None, &TaskContext::new())
        .unwrap();
    assert_eq!(converted.palette.unwrap().len(), 100);
    assert_eq!(converted.payload.len(), 64 * 64);
}

#[test]
fn test_progress_is_reported() {
    let (sender, receiver) = mpsc::channel();
    let ctx = TaskContext::new().with_progress(sender);
    let source = random_bitmap(3, 32, 32);
    let settings = TextureSettings::new(TextureFormat::Indexed(PixelDepth::Bpp4));

    TextureConverter::from_settings(&settings)
        .convert(&source, &settings, None, &ctx)
        .unwrap();
    drop(ctx);

    let updates: Vec<_> = receiver.iter().collect();
    assert!(!updates.is_empty());
    assert_eq!(updates.last().map(|p| p.percent), Some(100));
}

static YIELDS: AtomicUsize = AtomicUsize::new(0);

fn counting_yield() {
    YIELDS.fetch_add(1, Ordering::Relaxed);
}

#[test]
fn test_yield_hook_does_not_change_result() {
    let source = random_bitmap(11, 128, 128);
    let settings = TextureSettings {
        strategy: MatchStrategy::BestFit,
        ..TextureSettings::new(TextureFormat::Indexed(PixelDepth::Bpp4))
    };
    let converter = TextureConverter::from_settings(&settings);

    let plain = converter
        .convert(&source, &settings, None, &TaskContext::new())
        .unwrap();
    let chunked = converter
        .convert(
            &source,
            &settings,
            None,
            &TaskContext::new().with_yield(counting_yield),
        )
        .unwrap();

    assert!(YIELDS.load(Ordering::Relaxed) > 0);
    assert_eq!(chunked.palette, plain.palette);
    assert_eq!(chunked.payload, plain.payload);
    assert_eq!(chunked, plain);
}

#[test]
fn test_empty_frame_is_no_data() {
    assert!(matches!(
        bitmap_from_rgba(0, 0, Vec::new()),
        Err(PipelineError::NoData)
    ));
}

#[test]
fn test_fully_transparent_source_needs_palette() {
    let source = solid(2, 2, Color::TRANSPARENT);
    let settings = TextureSettings::new(TextureFormat::Indexed(PixelDepth::Bpp2));
    let converter = TextureConverter::from_settings(&settings);

    assert!(matches!(
        converter.convert(&source, &settings, None, &TaskContext::new()),
        Err(PipelineError::Quantize(_))
    ));

    let converted = converter
        .convert(&source, &settings, Some(&grey_ramp(4)), &TaskContext::new())
        .unwrap();
    assert_eq!(converted.payload, vec![0]);
}

#[test]
fn test_cache_reuses_encoded_binary() {
    let mut cache = TextureCache::new();
    let source = gradient(8, 8);
    let settings = TextureSettings::new(TextureFormat::Indexed(PixelDepth::Bpp2));
    let key = "grass";

    let fp = fingerprint(&source, &settings, None);
    assert!(cache.binary(&key, fp).is_none());

    let (bytes, _) = TextureConverter::from_settings(&settings)
        .encode_d2(&source, &settings, None, &TaskContext::new())
        .unwrap();
    cache.store_binary(key, fp, bytes.clone());
    assert_eq!(cache.binary(&key, fp), Some(&bytes[..]));

    let changed = TextureSettings {
        palette_offset: 4,
        ..settings
    };
    assert!(cache
        .binary(&key, fingerprint(&source, &changed, None))
        .is_none());
    assert!(cache.is_empty());
}
