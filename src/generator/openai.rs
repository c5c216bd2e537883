//! OpenAI-compatible image generation client.
//!
//! One generation is two HTTP round trips:
//!
//! ```text
//! POST {api_base}/images/generations   {model, prompt, size, n: 1}
//!   → {"data": [{"url": "https://..."}]}
//! GET  https://...                      → image bytes
//! ```
//!
//! The downloaded bytes must sniff as an image before anything is written,
//! so an HTML error page never ends up cached as `<food>_<hall>.png`. The
//! file is written under a temporary name and renamed into place; a reader
//! of the images directory never sees a half-written image.

use super::backend::{GeneratorError, ImageGenerator, existing_image};
use crate::config::GeneratorConfig;
use crate::naming::image_filename;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    model: &'a str,
    prompt: String,
    size: &'a str,
    n: u32,
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    data: Vec<GeneratedImage>,
}

#[derive(Debug, Deserialize)]
struct GeneratedImage {
    url: Option<String>,
}

/// Client for an OpenAI-compatible `images/generations` endpoint.
pub struct OpenAiGenerator {
    client: Client,
    api_key: String,
    images_dir: PathBuf,
    config: GeneratorConfig,
}

impl OpenAiGenerator {
    /// Build the client. Every request is bounded by `config.timeout_secs`.
    pub fn new(
        config: &GeneratorConfig,
        images_dir: &Path,
        api_key: String,
    ) -> Result<Self, GeneratorError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_key,
            images_dir: images_dir.to_path_buf(),
            config: config.clone(),
        })
    }

    fn generations_url(&self) -> String {
        format!(
            "{}/images/generations",
            self.config.api_base.trim_end_matches('/')
        )
    }

    fn prompt(&self, label: &str) -> String {
        self.config.prompt.replace("{food}", label)
    }

    /// Ask the API for an image and return the URL it was published at.
    fn request_image(&self, label: &str) -> Result<String, GeneratorError> {
        let request = GenerationRequest {
            model: &self.config.model,
            prompt: self.prompt(label),
            size: &self.config.size,
            n: 1,
        };
        let response = self
            .client
            .post(self.generations_url())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.bytes()?;
            return Err(GeneratorError::InvalidResponse(format!(
                "images endpoint returned {status}: {}",
                error_message(&body)
            )));
        }

        let parsed: GenerationResponse = response.json()?;
        parsed
            .data
            .into_iter()
            .find_map(|image| image.url)
            .ok_or_else(|| {
                GeneratorError::InvalidResponse("response contained no image url".into())
            })
    }

    fn download(&self, url: &str) -> Result<Vec<u8>, GeneratorError> {
        let bytes = self.client.get(url).send()?.error_for_status()?.bytes()?;
        image::guess_format(&bytes).map_err(|_| {
            GeneratorError::InvalidResponse("downloaded content is not an image".into())
        })?;
        Ok(bytes.to_vec())
    }

    fn store(&self, filename: &str, bytes: &[u8]) -> Result<(), GeneratorError> {
        fs::create_dir_all(&self.images_dir)?;
        let partial = self.images_dir.join(format!(".{filename}.part"));
        fs::write(&partial, bytes)?;
        fs::rename(&partial, self.images_dir.join(filename))?;
        Ok(())
    }
}

impl ImageGenerator for OpenAiGenerator {
    fn generate(&self, label: &str, category: &str) -> Result<String, GeneratorError> {
        if let Some(existing) = existing_image(&self.images_dir, label, category) {
            debug!(filename = %existing, "image already exists, skipping generation");
            return Ok(existing);
        }

        let filename = image_filename(label, category);
        info!(food = %label, dining_hall = %category, "generating image");
        let url = self.request_image(label)?;
        let bytes = self.download(&url)?;
        self.store(&filename, &bytes)?;
        info!(filename = %filename, bytes = bytes.len(), "generated image");
        Ok(filename)
    }
}

/// Pull `error.message` (or a top-level `message`) out of an API error body.
fn error_message(body: &[u8]) -> String {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/message")
                .or_else(|| value.get("message"))
                .and_then(|v| v.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| String::from_utf8_lossy(body).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread::{self, JoinHandle};
    use tempfile::TempDir;

    const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    /// Response for one request: status, content type, body.
    type Reply = (u16, &'static str, Vec<u8>);

    /// Serve exactly `expected` connections, one request each, and return
    /// the `"{request line} {body}"` of everything received.
    fn spawn_server<F>(expected: usize, respond: F) -> (String, JoinHandle<Vec<String>>)
    where
        F: Fn(&str, &str) -> Reply + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let mut seen = Vec::new();
            for stream in listener.incoming().take(expected) {
                let mut stream = stream.unwrap();
                let (request_line, body) = read_request(&mut stream);
                let (status, content_type, payload) = respond(&request_line, &body);
                let head = format!(
                    "HTTP/1.1 {status} Test\r\nContent-Type: {content_type}\r\n\
                     Content-Length: {}\r\nConnection: close\r\n\r\n",
                    payload.len()
                );
                stream.write_all(head.as_bytes()).unwrap();
                stream.write_all(&payload).unwrap();
                seen.push(format!("{request_line} {body}"));
            }
            seen
        });
        (base, handle)
    }

    fn read_request(stream: &mut TcpStream) -> (String, String) {
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut request_line = String::new();
        reader.read_line(&mut request_line).unwrap();
        let mut content_length = 0;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            if line == "\r\n" || line.is_empty() {
                break;
            }
            if let Some((key, value)) = line.split_once(':')
                && key.eq_ignore_ascii_case("content-length")
            {
                content_length = value.trim().parse().unwrap();
            }
        }
        let mut body = vec![0; content_length];
        reader.read_exact(&mut body).unwrap();
        (
            request_line.trim_end().to_string(),
            String::from_utf8_lossy(&body).into_owned(),
        )
    }

    fn generator(api_base: &str, images_dir: &Path) -> OpenAiGenerator {
        let config = GeneratorConfig {
            api_base: api_base.to_string(),
            timeout_secs: 5,
            ..GeneratorConfig::default()
        };
        OpenAiGenerator::new(&config, images_dir, "sk-test".into()).unwrap()
    }

    #[test]
    fn prompt_substitutes_food_name() {
        let tmp = TempDir::new().unwrap();
        let g = generator("https://api.example.test/v1/", tmp.path());
        assert_eq!(
            g.prompt("Pizza"),
            "A delicious, appetizing photo of Pizza with a small wiscosin madison badge"
        );
        assert_eq!(
            g.generations_url(),
            "https://api.example.test/v1/images/generations"
        );
    }

    #[test]
    fn existing_file_skips_network() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("pizza_gordon.png"), PNG_BYTES).unwrap();
        // Nothing listens here; any request would fail.
        let g = generator("http://127.0.0.1:1", tmp.path());
        assert_eq!(g.generate("Pizza", "Gordon").unwrap(), "pizza_gordon.png");
    }

    #[test]
    fn generates_and_caches_image() {
        let tmp = TempDir::new().unwrap();
        let listener_base = std::sync::Arc::new(std::sync::Mutex::new(String::new()));
        let shared = listener_base.clone();
        let (base, handle) = spawn_server(2, move |line, _body| {
            if line.starts_with("POST /v1/images/generations") {
                let url = format!("{}/files/img.png", shared.lock().unwrap());
                let json = serde_json::json!({ "data": [{ "url": url }] });
                (200, "application/json", json.to_string().into_bytes())
            } else {
                (200, "image/png", PNG_BYTES.to_vec())
            }
        });
        *listener_base.lock().unwrap() = base.clone();

        let g = generator(&format!("{base}/v1"), tmp.path());
        let filename = g.generate("Pizza", "Gordon").unwrap();

        assert_eq!(filename, "pizza_gordon.png");
        assert_eq!(fs::read(tmp.path().join(&filename)).unwrap(), PNG_BYTES);
        assert!(!tmp.path().join(".pizza_gordon.png.part").exists());

        let seen = handle.join().unwrap();
        assert!(seen[0].contains("\"model\":\"dall-e-2\""), "{}", seen[0]);
        assert!(seen[0].contains("photo of Pizza"), "{}", seen[0]);
        assert!(seen[1].starts_with("GET /files/img.png"), "{}", seen[1]);
    }

    #[test]
    fn non_image_download_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let listener_base = std::sync::Arc::new(std::sync::Mutex::new(String::new()));
        let shared = listener_base.clone();
        let (base, handle) = spawn_server(2, move |line, _body| {
            if line.starts_with("POST") {
                let url = format!("{}/files/img.png", shared.lock().unwrap());
                let json = serde_json::json!({ "data": [{ "url": url }] });
                (200, "application/json", json.to_string().into_bytes())
            } else {
                (200, "text/html", b"<html>expired</html>".to_vec())
            }
        });
        *listener_base.lock().unwrap() = base.clone();

        let g = generator(&format!("{base}/v1"), tmp.path());
        let result = g.generate("Pizza", "Gordon");

        assert!(matches!(result, Err(GeneratorError::InvalidResponse(_))));
        assert!(!tmp.path().join("pizza_gordon.png").exists());
        handle.join().unwrap();
    }

    #[test]
    fn error_status_surfaces_api_message() {
        let tmp = TempDir::new().unwrap();
        let (base, handle) = spawn_server(1, |_line, _body| {
            let json = serde_json::json!({ "error": { "message": "billing hard limit reached" } });
            (400, "application/json", json.to_string().into_bytes())
        });

        let g = generator(&format!("{base}/v1"), tmp.path());
        let err = g.generate("Pizza", "Gordon").unwrap_err();

        assert!(err.to_string().contains("billing hard limit reached"), "{err}");
        assert!(!tmp.path().join("pizza_gordon.png").exists());
        handle.join().unwrap();
    }

    #[test]
    fn empty_data_is_invalid() {
        let tmp = TempDir::new().unwrap();
        let (base, handle) = spawn_server(1, |_line, _body| {
            (200, "application/json", br#"{"data": []}"#.to_vec())
        });

        let g = generator(&format!("{base}/v1"), tmp.path());
        assert!(matches!(
            g.generate("Pizza", "Gordon"),
            Err(GeneratorError::InvalidResponse(_))
        ));
        handle.join().unwrap();
    }

    #[test]
    fn unreachable_endpoint_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let g = generator("http://127.0.0.1:1", tmp.path());
        assert!(matches!(
            g.generate("Pizza", "Gordon"),
            Err(GeneratorError::Request(_))
        ));
    }

    #[test]
    fn error_message_falls_back_to_raw_body() {
        assert_eq!(error_message(b"gateway timeout"), "gateway timeout");
        assert_eq!(error_message(br#"{"message":"nope"}"#), "nope");
    }
}
