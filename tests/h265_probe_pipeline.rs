//! H.265 码流探测集成测试

mod common;

use common::{HevcSpsParams, annexb, hevc_idr, hevc_sps, hevc_vps};
use esprobe::codec::HevcSpsOptions;
use esprobe::core::{PixelFormat, ProbeError, Rational};
use esprobe::{CodecId, ProbeConfig, probe};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_probe_main_1080p() {
    init_logger();
    let sps = HevcSpsParams {
        timing: Some((1, 25)),
        ..HevcSpsParams::default()
    };
    let data = annexb(&[hevc_vps(), hevc_sps(&sps), hevc_idr()]);

    let geometry = probe(CodecId::H265, &data, &ProbeConfig::default()).unwrap();
    assert_eq!(geometry.codec, CodecId::H265);
    assert_eq!((geometry.width, geometry.height), (1920, 1080));
    assert_eq!(geometry.bit_depth, 8);
    assert_eq!(geometry.chroma_format_idc, 1);
    assert_eq!(geometry.pixel_format, PixelFormat::Yuv420p);
    assert_eq!(geometry.frame_rate, Rational::new(25, 1));
    assert!(!geometry.interlaced);
}

#[test]
fn test_probe_main10() {
    let sps = HevcSpsParams {
        bit_depth: 10,
        width: 3840,
        height: 2160,
        conf_win: None,
        ..HevcSpsParams::default()
    };
    let data = annexb(&[hevc_sps(&sps)]);
    let geometry = probe(CodecId::H265, &data, &ProbeConfig::default()).unwrap();
    assert_eq!((geometry.width, geometry.height), (3840, 2160));
    assert_eq!(geometry.bit_depth, 10);
    assert_eq!(geometry.pixel_format, PixelFormat::Yuv420p10le);
    assert_eq!(geometry.frame_rate, Rational::UNDEFINED);
}

#[test]
fn test_probe_reject_422() {
    let sps = HevcSpsParams {
        chroma_format_idc: 2,
        ..HevcSpsParams::default()
    };
    let data = annexb(&[hevc_sps(&sps)]);
    let err = probe(CodecId::H265, &data, &ProbeConfig::default()).expect_err("4:2:2 应失败");
    assert!(matches!(err, ProbeError::Unsupported(_)), "{err}");
}

#[test]
fn test_probe_field_seq_reported() {
    let sps = HevcSpsParams {
        field_seq: true,
        ..HevcSpsParams::default()
    };
    let data = annexb(&[hevc_sps(&sps), hevc_idr()]);
    let geometry = probe(CodecId::H265, &data, &ProbeConfig::default()).unwrap();
    assert!(geometry.interlaced);
}

#[test]
fn test_probe_default_display_window() {
    init_logger();
    let sps = HevcSpsParams {
        conf_win: None,
        default_display_window: Some([8, 8, 0, 4]),
        ..HevcSpsParams::default()
    };
    let data = annexb(&[hevc_sps(&sps)]);

    // 默认不合并显示窗口
    let geometry = probe(CodecId::H265, &data, &ProbeConfig::default()).unwrap();
    assert_eq!((geometry.width, geometry.height), (1920, 1088));

    let cfg = ProbeConfig {
        hevc: HevcSpsOptions {
            apply_default_display_window: true,
            ignore_crop: false,
        },
        ..ProbeConfig::default()
    };
    let geometry = probe(CodecId::H265, &data, &cfg).unwrap();
    assert_eq!((geometry.width, geometry.height), (1888, 1080));
}

#[test]
fn test_probe_ignore_crop() {
    let cfg = ProbeConfig {
        hevc: HevcSpsOptions {
            apply_default_display_window: false,
            ignore_crop: true,
        },
        ..ProbeConfig::default()
    };
    let data = annexb(&[hevc_sps(&HevcSpsParams::default())]);
    let geometry = probe(CodecId::H265, &data, &cfg).unwrap();
    assert_eq!((geometry.width, geometry.height), (1920, 1088));
}

#[test]
fn test_probe_stops_at_first_sps() {
    let first = hevc_sps(&HevcSpsParams::default());
    let second = hevc_sps(&HevcSpsParams {
        width: 1280,
        height: 720,
        conf_win: None,
        ..HevcSpsParams::default()
    });
    let data = annexb(&[hevc_idr(), first, second]);
    let geometry = probe(CodecId::H265, &data, &ProbeConfig::default()).unwrap();
    assert_eq!((geometry.width, geometry.height), (1920, 1080));
}

#[test]
fn test_probe_skips_invalid_nal_headers() {
    init_logger();
    let small = HevcSpsParams {
        width: 1280,
        height: 720,
        conf_win: None,
        ..HevcSpsParams::default()
    };
    // forbidden_zero_bit=1
    let mut forbidden = hevc_sps(&small);
    forbidden[0] |= 0x80;
    // nuh_temporal_id_plus1=0
    let mut zero_tid = hevc_sps(&small);
    zero_tid[1] = 0x00;
    let data = annexb(&[forbidden, zero_tid, hevc_sps(&HevcSpsParams::default())]);
    let geometry = probe(CodecId::H265, &data, &ProbeConfig::default()).unwrap();
    assert_eq!((geometry.width, geometry.height), (1920, 1080));
}

#[test]
fn test_probe_vcl_cap_without_sps() {
    init_logger();
    let mut nals = vec![hevc_vps()];
    nals.extend(std::iter::repeat_with(hevc_idr).take(10));
    nals.push(hevc_sps(&HevcSpsParams::default()));
    let cfg = ProbeConfig {
        max_vcl_units: 5,
        ..ProbeConfig::default()
    };
    let err = probe(CodecId::H265, &annexb(&nals), &cfg).expect_err("达到 VCL 上限应失败");
    assert!(format!("{err}").contains("SPS"));

    // 上限足够时可以找到 SPS
    let geometry = probe(CodecId::H265, &annexb(&nals), &ProbeConfig::default()).unwrap();
    assert_eq!(geometry.height, 1080);
}
