//! ElevenLabs text-to-speech, used when the device has no usable Urdu voice.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use base64::Engine;
use futures::future::LocalBoxFuture;
use language_utils::{Language, TtsProvider, TtsRequest};
use ledger::{KeyValueStore, StorageError};
use xxhash_rust::const_xxh3::xxh3_64 as const_xxh3;

pub const API_KEY_STORAGE_KEY: &str = "elevenLabsApiKey";
const API_URL: &str = "https://api.elevenlabs.io/v1/text-to-speech";
const URDU_VOICE_ID: &str = "pFZP5JQG7iQjIQuC4Bku";
const DEFAULT_VOICE_ID: &str = "EXAVITQu4vr4xnSDxMaL";
const MODEL_ID: &str = "eleven_multilingual_v2";

#[derive(Debug, thiserror::Error)]
pub enum TtsError {
    #[error("no API key configured")]
    NotConfigured,
    #[error("request failed: {0}")]
    Request(String),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("could not decode response: {0}")]
    Decode(String),
    #[error("response was not MP3 audio")]
    InvalidAudio,
}

/// Turns text into MP3 audio.
pub trait SpeechService {
    fn is_configured(&self) -> bool;
    fn synthesize(&self, request: &TtsRequest) -> LocalBoxFuture<'static, Result<Vec<u8>, TtsError>>;
}

pub fn voice_id(language: Language) -> &'static str {
    match language {
        Language::Urdu => URDU_VOICE_ID,
        Language::English | Language::Arabic => DEFAULT_VOICE_ID,
    }
}

pub fn cache_key(request: &TtsRequest, provider: &TtsProvider) -> u64 {
    let cache_text = format!(
        "{provider:?}:{text}:{language}",
        text = request.text,
        language = request.language
    );
    const_xxh3(cache_text.as_bytes())
}

pub(crate) fn is_valid_mp3_data(bytes: &[u8]) -> bool {
    if bytes.len() < 2 {
        return false;
    }

    // Valid MP3 files either start with an ID3 tag or an MPEG frame sync (0xFFF)
    bytes.starts_with(b"ID3") || (bytes[0] == 0xFF && bytes[1] & 0xE0 == 0xE0)
}

#[derive(serde::Deserialize)]
struct TimestampedAudio {
    audio_base64: String,
}

pub struct ElevenLabs {
    store: Rc<dyn KeyValueStore>,
    cache: Rc<RefCell<HashMap<u64, Vec<u8>>>>,
}

impl ElevenLabs {
    pub fn new(store: Rc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            cache: Default::default(),
        }
    }

    pub fn api_key(&self) -> Option<String> {
        self.store
            .get(API_KEY_STORAGE_KEY)
            .inspect_err(|e| log::warn!("Failed to read ElevenLabs API key: {e:?}"))
            .ok()
            .flatten()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }

    /// Returns whether a non-empty key is now configured.
    pub fn set_api_key(&self, api_key: &str) -> Result<bool, StorageError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            self.store.remove(API_KEY_STORAGE_KEY)?;
            return Ok(false);
        }
        self.store.set(API_KEY_STORAGE_KEY, api_key)?;
        Ok(true)
    }

    fn cached(&self, key: u64) -> Option<Vec<u8>> {
        let mut cache = self.cache.borrow_mut();
        let bytes = cache.get(&key)?;
        if is_valid_mp3_data(bytes) {
            return Some(bytes.clone());
        }
        log::warn!("Invalid audio cache detected for {key}, refetching");
        cache.remove(&key);
        None
    }
}

async fn fetch_audio(api_key: String, request: TtsRequest) -> Result<Vec<u8>, TtsError> {
    let client = fetch_happen::Client;
    let body = serde_json::json!({
        "text": request.text,
        "model_id": MODEL_ID,
        "voice_settings": {
            "stability": 0.5,
            "similarity_boost": 0.75,
            "style": 0.0,
            "use_speaker_boost": true,
        },
    });
    let url = format!(
        "{API_URL}/{voice}/with-timestamps",
        voice = voice_id(request.language)
    );

    let response = client
        .post(&url)
        .header("xi-api-key", api_key)
        .header("Accept", "application/json")
        .json(&body)
        .map_err(|e| TtsError::Request(format!("{e:?}")))?
        .send()
        .await
        .map_err(|e| TtsError::Request(format!("{e:?}")))?;

    if !response.ok() {
        return Err(TtsError::Http(format!("{}", response.status())));
    }

    let text = response
        .text()
        .await
        .map_err(|e| TtsError::Decode(format!("{e:?}")))?;
    let audio: TimestampedAudio =
        serde_json::from_str(&text).map_err(|e| TtsError::Decode(format!("{e}")))?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(&audio.audio_base64)
        .map_err(|e| TtsError::Decode(format!("Base64 decode error: {e:?}")))?;

    if !is_valid_mp3_data(&bytes) {
        return Err(TtsError::InvalidAudio);
    }
    Ok(bytes)
}

impl SpeechService for ElevenLabs {
    fn is_configured(&self) -> bool {
        self.api_key().is_some()
    }

    fn synthesize(&self, request: &TtsRequest) -> LocalBoxFuture<'static, Result<Vec<u8>, TtsError>> {
        let key = cache_key(request, &TtsProvider::ElevenLabs);
        let cached = self.cached(key);
        let api_key = self.api_key();
        let cache = self.cache.clone();
        let request = request.clone();

        Box::pin(async move {
            if let Some(bytes) = cached {
                return Ok(bytes);
            }
            let api_key = api_key.ok_or(TtsError::NotConfigured)?;
            log::info!("Fetching ElevenLabs audio for {:?}", request.text);
            let bytes = fetch_audio(api_key, request).await?;
            cache.borrow_mut().insert(key, bytes.clone());
            Ok(bytes)
        })
    }
}
