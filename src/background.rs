//! Background image loading. Every failure here is absorbed: a missing or
//! broken image just means the flat fallback color is painted instead.

use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use base64::Engine;
use custom_debug::Debug;
use miette::{miette, IntoDiagnostic, Result, WrapErr};
use url::Url;

/// A decoded background ready to be painted.
#[derive(Debug)]
pub struct Background {
    #[debug(skip)]
    surface: cairo::ImageSurface,
    width: u32,
    height: u32,
}

fn premultiply(channel: u8, alpha: u8) -> u32 {
    let prod = u32::from(channel) * u32::from(alpha) + 127;
    (prod + (prod >> 8)) >> 8
}

impl Background {
    /// Decodes any raster format the `image` crate recognises.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory(bytes)
            .into_diagnostic()
            .wrap_err("failed to decode background image")?;
        Self::from_rgba(&decoded.to_rgba8())
    }

    pub fn from_rgba(rgba: &image::RgbaImage) -> Result<Self> {
        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            return Err(miette!("background image is empty"));
        }
        let stride = width as usize * 4;
        let mut data = vec![0u8; stride * height as usize];
        for (src, dst) in rgba.as_raw().chunks_exact(4).zip(data.chunks_exact_mut(4)) {
            let a = src[3];
            let argb = u32::from(a) << 24
                | premultiply(src[0], a) << 16
                | premultiply(src[1], a) << 8
                | premultiply(src[2], a);
            dst.copy_from_slice(&argb.to_ne_bytes());
        }
        let surface = cairo::ImageSurface::create_for_data(
            data,
            cairo::Format::ARgb32,
            i32::try_from(width).into_diagnostic()?,
            i32::try_from(height).into_diagnostic()?,
            i32::try_from(stride).into_diagnostic()?,
        )
        .into_diagnostic()
        .wrap_err("failed to wrap background pixels in a cairo surface")?;
        Ok(Background { surface, width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub(crate) fn surface(&self) -> &cairo::ImageSurface {
        &self.surface
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum BackgroundSource {
    Url {
        #[debug(format = "{}")]
        url: Url,
    },
    DataUri {
        mime: String,
        #[debug(skip)]
        bytes: Vec<u8>,
    },
    Path(PathBuf),
}

impl BackgroundSource {
    /// `http(s)://` and `file://` URLs, `data:` URIs, anything else is taken
    /// as a local path.
    pub fn parse(source: &str) -> Result<Self> {
        let source = source.trim();
        if let Some(rest) = source.strip_prefix("data:") {
            let (header, payload) = rest
                .split_once(',')
                .ok_or_else(|| miette!("data URI has no payload"))?;
            let mime = header
                .split(';')
                .next()
                .filter(|m| !m.is_empty())
                .unwrap_or("application/octet-stream")
                .to_owned();
            let bytes = if header.split(';').any(|p| p == "base64") {
                base64::engine::general_purpose::STANDARD
                    .decode(payload.trim())
                    .into_diagnostic()
                    .wrap_err("data URI payload is not valid base64")?
            } else {
                payload.as_bytes().to_vec()
            };
            return Ok(BackgroundSource::DataUri { mime, bytes });
        }

        match Url::parse(source) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(BackgroundSource::Url { url }),
            Ok(url) if url.scheme() == "file" => url
                .to_file_path()
                .map(BackgroundSource::Path)
                .map_err(|_| miette!("file URL {} has no local path", url)),
            _ => Ok(BackgroundSource::Path(PathBuf::from(source))),
        }
    }

    pub async fn into_bytes(self, client: &reqwest::Client) -> Result<Vec<u8>> {
        match self {
            BackgroundSource::Url { url } => {
                let response = client
                    .get(url.clone())
                    .send()
                    .await
                    .into_diagnostic()?
                    .error_for_status()
                    .into_diagnostic()
                    .wrap_err_with(|| format!("background request to {url} failed"))?;
                Ok(response.bytes().await.into_diagnostic()?.to_vec())
            }
            BackgroundSource::DataUri { bytes, .. } => Ok(bytes),
            BackgroundSource::Path(path) => tokio::fs::read(&path)
                .await
                .into_diagnostic()
                .wrap_err_with(|| format!("failed to read background {}", path.display())),
        }
    }
}

/// Keeps the last decoded background, keyed by its source string.
#[derive(Debug)]
pub struct BackgroundCache {
    #[debug(skip)]
    client: reqwest::Client,
    source: Option<String>,
    image: Option<Rc<Background>>,
}

impl BackgroundCache {
    pub fn new(client: reqwest::Client) -> Self {
        BackgroundCache { client, source: None, image: None }
    }

    /// Cache whose HTTP fetches give up after `timeout`, covering connect,
    /// headers and body.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .into_diagnostic()
            .wrap_err("failed to build http client")?;
        Ok(Self::new(client))
    }

    async fn fetch_and_decode(&self, source: &str) -> Result<Background> {
        let bytes = BackgroundSource::parse(source)?.into_bytes(&self.client).await?;
        Background::decode(&bytes)
    }

    /// Resolves `source` to a decoded background. Only decodes again when the
    /// source differs from the previous successful load; failures are logged
    /// and yield `None`.
    pub async fn load(&mut self, source: Option<&str>) -> Option<Rc<Background>> {
        let source = source.map(str::trim).filter(|s| !s.is_empty())?;
        if self.source.as_deref() == Some(source) {
            if let Some(image) = &self.image {
                return Some(Rc::clone(image));
            }
        }

        match self.fetch_and_decode(source).await {
            Ok(background) => {
                tracing::info!(width = background.width, height = background.height, "decoded background");
                let image = Rc::new(background);
                self.source = Some(source.to_owned());
                self.image = Some(Rc::clone(&image));
                Some(image)
            }
            Err(err) => {
                tracing::warn!("background unavailable, using fallback fill: {:?}", err);
                self.source = None;
                self.image = None;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::path::PathBuf;
    use std::rc::Rc;
    use std::time::{Duration, Instant};

    use base64::Engine;

    use super::{Background, BackgroundCache, BackgroundSource};

    fn png_bytes(w: u32, h: u32, px: [u8; 4]) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(w, h, image::Rgba(px));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png).unwrap();
        bytes
    }

    fn data_uri(bytes: &[u8]) -> String {
        format!("data:image/png;base64,{}", base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    #[test]
    fn parse_sources() {
        match BackgroundSource::parse("https://res.cloudinary.com/demo/image/upload/sample.jpg").unwrap() {
            BackgroundSource::Url { url } => assert_eq!("res.cloudinary.com", url.host_str().unwrap()),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            BackgroundSource::Path(PathBuf::from("backgrounds/sea.png")),
            BackgroundSource::parse("backgrounds/sea.png").unwrap()
        );
        assert_eq!(
            BackgroundSource::DataUri { mime: "text/plain".to_owned(), bytes: b"Hello".to_vec() },
            BackgroundSource::parse("data:text/plain;base64,SGVsbG8=").unwrap()
        );
        assert!(BackgroundSource::parse("data:image/png;base64").is_err());
        assert!(BackgroundSource::parse("data:image/png;base64,!!!").is_err());
    }

    #[test]
    fn decode_png() {
        let bg = Background::decode(&png_bytes(3, 2, [10, 20, 30, 255])).unwrap();
        assert_eq!((3, 2), (bg.width(), bg.height()));
        assert!(Background::decode(b"definitely not an image").is_err());
    }

    #[tokio::test]
    async fn cache_reuses_decoded_image() {
        let mut cache = BackgroundCache::new(reqwest::Client::new());
        let uri = data_uri(&png_bytes(4, 4, [0, 128, 255, 255]));
        let first = cache.load(Some(&uri)).await.unwrap();
        let second = cache.load(Some(&uri)).await.unwrap();
        assert!(Rc::ptr_eq(&first, &second));

        let other = data_uri(&png_bytes(2, 2, [0, 0, 0, 255]));
        let third = cache.load(Some(&other)).await.unwrap();
        assert!(!Rc::ptr_eq(&first, &third));
        assert_eq!(2, third.width());
    }

    #[tokio::test]
    async fn broken_or_missing_source_yields_none() {
        let mut cache = BackgroundCache::new(reqwest::Client::new());
        assert!(cache.load(None).await.is_none());
        assert!(cache.load(Some("   ")).await.is_none());
        assert!(cache.load(Some("data:image/png;base64,AAAA")).await.is_none());
        assert!(cache.load(Some("/nonexistent/background-3f9a.png")).await.is_none());
    }

    #[tokio::test]
    async fn silent_server_times_out_to_fallback() {
        // accepts connections and never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let mut cache = BackgroundCache::with_timeout(Duration::from_millis(300)).unwrap();
        let started = Instant::now();
        let url = format!("http://{addr}/background.jpg");
        assert!(cache.load(Some(&url)).await.is_none());
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
