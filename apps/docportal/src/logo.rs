//! Fetching and decoding logo images for the menu bar.

use dp_core::PortalError;
use dp_core::PortalResult;
use dp_net::NetStack;
use image::GenericImageView;
use url::Url;

const ACCEPT_IMAGE: &str = "image/avif,image/webp,image/png,image/svg+xml,image/*;q=0.8";
const MAX_LOGO_PIXELS: usize = 4 * 1024 * 1024;

/// RGBA pixels ready to upload as a texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedLogo {
    pub width: usize,
    pub height: usize,
    pub rgba: Vec<u8>,
}

/// Downloads `logo_url`, which may be relative to `server_url`.
pub fn fetch_logo(net: &NetStack, server_url: &str, logo_url: &str) -> PortalResult<DecodedLogo> {
    let base = Url::parse(server_url).map_err(|_| PortalError::unparseable(server_url))?;
    let absolute = base
        .join(logo_url)
        .map_err(|_| PortalError::unparseable(logo_url))?;

    let response = net.fetch(absolute.as_str(), ACCEPT_IMAGE)?;
    if !response.status.is_success() {
        return Err(PortalError::Api {
            status: response.status.as_u16(),
            message: format!("logo {absolute} unavailable"),
        });
    }

    decode_logo(absolute.as_str(), response.content_type(), &response.body).ok_or_else(|| {
        PortalError::Decode {
            message: format!("unsupported logo image {absolute}"),
        }
    })
}

pub fn decode_logo(url: &str, content_type: &str, body: &[u8]) -> Option<DecodedLogo> {
    let content_type = content_type.to_ascii_lowercase();
    let lower_url = url.to_ascii_lowercase();
    if is_svg_candidate(&content_type, &lower_url, body) {
        if let Some(logo) = decode_svg(body) {
            return Some(logo);
        }
    }

    if !(content_type.starts_with("image/")
        || [".png", ".jpg", ".jpeg", ".gif", ".webp"]
            .iter()
            .any(|extension| strip_query_and_fragment(&lower_url).ends_with(extension)))
    {
        return None;
    }

    let decoded = image::load_from_memory(body).ok()?;
    let (width, height) = decoded.dimensions();
    let width = usize::try_from(width).ok()?;
    let height = usize::try_from(height).ok()?;
    let pixels = width.checked_mul(height)?;
    if pixels == 0 || pixels > MAX_LOGO_PIXELS {
        return None;
    }

    Some(DecodedLogo {
        width,
        height,
        rgba: decoded.to_rgba8().into_raw(),
    })
}

fn is_svg_candidate(content_type: &str, lower_url: &str, body: &[u8]) -> bool {
    content_type.contains("image/svg+xml")
        || strip_query_and_fragment(lower_url).ends_with(".svg")
        || looks_like_svg(body)
}

fn strip_query_and_fragment(url: &str) -> &str {
    let before_fragment = url.split_once('#').map_or(url, |(head, _)| head);
    before_fragment
        .split_once('?')
        .map_or(before_fragment, |(head, _)| head)
}

fn looks_like_svg(body: &[u8]) -> bool {
    let body = body.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(body);
    let start = body
        .iter()
        .position(|byte| !byte.is_ascii_whitespace())
        .unwrap_or(body.len());
    let body = &body[start..];

    body.starts_with(b"<svg")
        || (body.starts_with(b"<?xml") && body.windows(4).any(|window| window == b"<svg"))
}

fn decode_svg(body: &[u8]) -> Option<DecodedLogo> {
    let options = resvg::usvg::Options::default();
    let tree = resvg::usvg::Tree::from_data(body, &options).ok()?;
    let size = tree.size().to_int_size();
    let width = usize::try_from(size.width()).ok()?;
    let height = usize::try_from(size.height()).ok()?;
    let pixels = width.checked_mul(height)?;
    if pixels == 0 || pixels > MAX_LOGO_PIXELS {
        return None;
    }

    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())?;
    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::identity(),
        &mut pixmap.as_mut(),
    );
    Some(DecodedLogo {
        width,
        height,
        rgba: pixmap.data().to_vec(),
    })
}
