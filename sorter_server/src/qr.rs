//! Claim QR codes.

use std::io::Cursor;

use eyre::WrapErr;
use image::{ImageFormat, Luma};
use qrcode::QrCode;

const MIN_SIZE_PX: u32 = 256;

/// `{base}/claim/{transaction_id}?secret={claim_secret}`, with both values
/// percent-encoded.
pub fn claim_url(base_url: &str, transaction_id: &str, claim_secret: &str) -> String {
    format!(
        "{}/claim/{}?secret={}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(transaction_id),
        urlencoding::encode(claim_secret)
    )
}

/// Encode `data` as a black-on-white PNG QR code.
pub fn render_png(data: &str) -> eyre::Result<Vec<u8>> {
    let code = QrCode::new(data.as_bytes()).wrap_err("encode claim QR code")?;
    let img = code
        .render::<Luma<u8>>()
        .min_dimensions(MIN_SIZE_PX, MIN_SIZE_PX)
        .build();
    let mut png = Cursor::new(Vec::new());
    img.write_to(&mut png, ImageFormat::Png)
        .wrap_err("write claim QR PNG")?;
    Ok(png.into_inner())
}
