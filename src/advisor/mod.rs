// region:    --- Imports
use serde_json::json;
use tracing::info;

// endregion: --- Imports

// region:    --- Bid Advisor

/// Outbound bid-advice call against a hosted text-generation API. Purely
/// advisory: no state, and callers treat any failure as non-fatal.
pub struct BidAdvisor {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl BidAdvisor {
    pub fn from_env() -> Self {
        let api_url = std::env::var("ADVISOR_API_URL").unwrap_or_else(|_| {
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent"
                .to_string()
        });
        let api_key = std::env::var("ADVISOR_API_KEY").unwrap_or_default();
        Self {
            client: reqwest::Client::new(),
            api_url,
            api_key,
        }
    }

    /// Ask whether a higher bid looks sensible for this listing.
    pub async fn advise(
        &self,
        title: &str,
        description: &str,
        current_bid: i64,
    ) -> Result<String, String> {
        info!("{:<12} --> advice requested: {:?}", "Advisor", title);

        let prompt = format!(
            "This is the item: {}, this is the description of the item: {}, \
             this is the current highest bid ${:.2}, do you think it is smart \
             to make a higher bid? Return a short and concise answer.",
            title,
            description,
            current_bid as f64 / 100.0
        );
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self
            .client
            .post(format!("{}?key={}", self.api_url, self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("advisor returned {}", response.status()));
        }

        let value: serde_json::Value = response.json().await.map_err(|e| e.to_string())?;
        value["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| "advisor response had no text".to_string())
    }
}

// endregion: --- Bid Advisor
