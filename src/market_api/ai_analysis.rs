use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::AdvisoryError;

use super::ai_analysis_json::parse_advice;
use super::ai_api_config::GeminiConfig;
use super::http_client::build_http_client;
use super::indicator_engine::CandleIndicators;
use super::types::{Candle, Language, LiquidityLevels, MarketSnapshot, PivotPoints, Timeframe};

/// Candles of recent history handed to the advisor.
pub const RECENT_CANDLES: usize = 10;

pub const SYSTEM_INSTRUCTION: &str = r#"You are "MM-Hub Consensus Engine", a trading decision system for Binance Futures.
Three internal agents analyse the OHLCV context:
1. [Chartist]: price action, support/resistance levels and trend; looks for entries.
2. [Skeptic]: looks for reasons to cancel the trade: liquidity traps, divergences, manipulation risk.
3. [Risk Manager]: sizes the risk and vetoes any trade with confidence below 70.
The agents debate, then cast a weighted vote, then produce the final JSON.
Write "thought_process" and every other text field in the requested target language.
Return ONLY a valid JSON object."#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    Buy,
    Sell,
    Wait,
}

/// Validated advisor answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advice {
    pub narrative: String,
    pub decision: Decision,
    /// 0..=100
    pub confidence: f64,
    pub entry_zone: String,
    pub stop_loss: String,
    pub take_profit: String,
    pub leverage: String,
}

/// Everything the advisor gets to see about one market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryRequest {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub price: f64,
    pub change_24h: f64,
    pub indicators: CandleIndicators,
    pub liquidity_levels: Option<LiquidityLevels>,
    pub pivot_points: Option<PivotPoints>,
    pub recent_candles: Vec<Candle>,
    pub language: Language,
}

impl AdvisoryRequest {
    pub fn from_snapshot(snapshot: &MarketSnapshot, language: Language) -> Self {
        let skip = snapshot.candles.len().saturating_sub(RECENT_CANDLES);
        Self {
            symbol: snapshot.symbol.clone(),
            timeframe: snapshot.timeframe,
            price: snapshot.price,
            change_24h: snapshot.change_24h,
            indicators: snapshot.latest_indicators,
            liquidity_levels: snapshot.liquidity_levels,
            pivot_points: snapshot.pivot_points,
            recent_candles: snapshot.candles[skip..].iter().map(|c| c.candle).collect(),
            language,
        }
    }

    /// User prompt text. Absent values are written as `n/a`, never as zero.
    pub fn prompt(&self) -> String {
        let lang = self.language.display_name();
        let tf = self.timeframe;
        let ind = &self.indicators;

        let macd = ind
            .macd
            .map(|m| {
                format!("{:.4} (Signal: {:.4}, Hist: {:.4})", m.line, m.signal, m.histogram)
            })
            .unwrap_or_else(|| "n/a".to_string());
        let bollinger = ind
            .bollinger
            .map(|b| format!("Upper {:.2}, Middle {:.2}, Lower {:.2}", b.upper, b.middle, b.lower))
            .unwrap_or_else(|| "n/a".to_string());
        let stochastic = ind
            .stochastic
            .map(|s| format!("K {:.2}, D {:.2}", s.k, s.d))
            .unwrap_or_else(|| "n/a".to_string());

        let liquidity = match &self.liquidity_levels {
            Some(l) => format!(
                "- BSL (High): {:.2}\n- SSL (Low): {:.2}\n\
                 - Key Levels: 75% ({:.2}), 50% ({:.2}), 25% ({:.2})",
                l.bsl, l.ssl, l.level75, l.level50, l.level25
            ),
            None => "- unavailable".to_string(),
        };
        let pivots = match &self.pivot_points {
            Some(p) => format!(
                "- R2: {:.2}\n- R1: {:.2}\n- P: {:.2}\n- S1: {:.2}\n- S2: {:.2}",
                p.r2, p.r1, p.p, p.s1, p.s2
            ),
            None => "- unavailable".to_string(),
        };
        let history = self
            .recent_candles
            .iter()
            .map(|c| {
                format!(
                    "Time: {}, O: {}, H: {}, L: {}, C: {}, V: {}",
                    c.time.format("%Y-%m-%d %H:%M"),
                    c.open,
                    c.high,
                    c.low,
                    c.close,
                    c.volume
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"Market Snapshot:
Symbol: {symbol}
Timeframe: {tf}
Current Price: {price}
24h Change: {change}%
Target Language: {lang}

Technical Indicators ({tf}):
- RSI: {rsi}
- MACD: {macd}
- EMA fast: {ema_fast}
- EMA slow: {ema_slow}
- Bollinger Bands: {bollinger}
- Stochastic: {stochastic}
- CCI: {cci}
- Williams %R: {williams_r}
- Momentum: {momentum}

Strong_IMP Levels (1D):
{liquidity}

Classic Pivot Points:
{pivots}

Recent Price History ({tf} candles):
{history}

Task: Provide a consensus trading decision. Ensure all text output is in {lang}."#,
            symbol = self.symbol,
            price = self.price,
            change = self.change_24h,
            rsi = fmt_opt(ind.rsi, 2),
            ema_fast = fmt_opt(ind.ema_fast, 2),
            ema_slow = fmt_opt(ind.ema_slow, 2),
            cci = fmt_opt(ind.cci, 2),
            williams_r = fmt_opt(ind.williams_r, 2),
            momentum = fmt_opt(ind.momentum, 2),
        )
    }
}

fn fmt_opt(value: Option<f64>, precision: usize) -> String {
    value
        .map(|v| format!("{:.*}", precision, v))
        .unwrap_or_else(|| "n/a".to_string())
}

/// External advisory model.
#[async_trait]
pub trait Advisor: Send + Sync {
    async fn advise(&self, request: &AdvisoryRequest) -> Result<Advice, AdvisoryError>;
}

/// Google Gemini `generateContent` with a JSON response schema.
#[derive(Debug, Clone)]
pub struct GeminiAdvisor {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiAdvisor {
    pub fn new(config: GeminiConfig, timeout: Duration) -> Result<Self, AdvisoryError> {
        let client = build_http_client(timeout).map_err(AdvisoryError::Configuration)?;
        Ok(Self { client, config })
    }

    fn request_body(request: &AdvisoryRequest) -> serde_json::Value {
        serde_json::json!({
            "systemInstruction": {
                "parts": [{ "text": SYSTEM_INSTRUCTION }]
            },
            "contents": [{
                "role": "user",
                "parts": [{ "text": request.prompt() }]
            }],
            "generationConfig": {
                "temperature": 0.3,
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "OBJECT",
                    "properties": {
                        "thought_process": {
                            "type": "STRING",
                            "description": "Brief summary of agent debates (max 50 words) in the target language."
                        },
                        "decision": { "type": "STRING", "enum": ["BUY", "SELL", "WAIT"] },
                        "confidence": { "type": "NUMBER", "description": "Confidence score from 0 to 100." },
                        "entry_zone": { "type": "STRING", "description": "Recommended entry price or range." },
                        "stop_loss": { "type": "STRING", "description": "Recommended stop loss price." },
                        "take_profit": { "type": "STRING", "description": "Recommended take profit price." },
                        "leverage": { "type": "STRING", "description": "Recommended leverage (max 5x)." }
                    },
                    "required": [
                        "thought_process", "decision", "confidence", "entry_zone",
                        "stop_loss", "take_profit", "leverage"
                    ]
                }
            }
        })
    }
}

/// Pulls `candidates[0].content.parts[0].text` out of a Gemini response.
pub fn gemini_response_text(json: &serde_json::Value) -> Result<&str, AdvisoryError> {
    if let Some(error) = json.get("error") {
        let message = error["message"].as_str().unwrap_or("unknown Gemini API error");
        return Err(AdvisoryError::Parse(format!("Gemini API error: {}", message)));
    }

    json["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .filter(|text| !text.trim().is_empty())
        .ok_or(AdvisoryError::EmptyResponse)
}

#[async_trait]
impl Advisor for GeminiAdvisor {
    async fn advise(&self, request: &AdvisoryRequest) -> Result<Advice, AdvisoryError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| AdvisoryError::Configuration("Gemini API key is not set".to_string()))?;

        let url = self.config.generate_content_url(api_key);
        debug!(
            symbol = %request.symbol,
            timeframe = %request.timeframe,
            model = %self.config.model,
            "requesting advisory"
        );

        let response = self
            .client
            .post(&url)
            .json(&Self::request_body(request))
            .send()
            .await
            .map_err(|e| AdvisoryError::Network(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "advisory request rejected");
            return Err(AdvisoryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AdvisoryError::Parse(e.to_string()))?;

        let text = gemini_response_text(&json)?;
        parse_advice(text)
    }
}
