use anyhow::Result;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use qrcode::QrCode;
use qrcode::render::svg;

/// Renders `text` as a QR image packaged as an SVG data URI.
pub fn render_qr_data_uri(text: &str) -> Result<String> {
    let code = QrCode::new(text.as_bytes())?;
    let image = code.render::<svg::Color>().min_dimensions(256, 256).build();

    Ok(format!(
        "data:image/svg+xml;base64,{}",
        STANDARD.encode(image)
    ))
}
