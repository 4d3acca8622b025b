//! Bybit v5 REST market gateway

use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use log::debug;
use serde::Deserialize;
use sha2::Sha256;

use crate::config::ApiConfig;
use crate::engine::errors::{BotError, BotResult};
use crate::engine::executor::MarketGateway;
use crate::engine::types::{OrderAck, OrderSide, PriceQuote, SymbolConstraints};

type HmacSha256 = Hmac<Sha256>;

pub const MAINNET_API_URL: &str = "https://api.bybit.com";
pub const TESTNET_API_URL: &str = "https://api-testnet.bybit.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const RECV_WINDOW: &str = "5000";
/// Only linear perpetuals are supported
const CATEGORY: &str = "linear";
/// Response header carrying the remaining rate-limit budget
const LIMIT_STATUS_HEADER: &str = "X-Bapi-Limit-Status";

/// REST gateway against Bybit's v5 unified-trading API.
///
/// `test_mode` selects the testnet host. Market-data endpoints are public;
/// order placement is signed with HMAC-SHA256 per Bybit's
/// `timestamp + api_key + recv_window + body` scheme.
pub struct BybitGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    api_secret: String,
}

impl BybitGateway {
    pub fn new(api: &ApiConfig, test_mode: bool) -> BotResult<Self> {
        let mut builder = reqwest::Client::builder().timeout(REQUEST_TIMEOUT);
        if let Some(proxy_url) = &api.proxy_url {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| BotError::InvalidConfig(format!("bad proxy URL: {}", e)))?;
            builder = builder.proxy(proxy);
        }

        let base_url = if test_mode {
            TESTNET_API_URL
        } else {
            MAINNET_API_URL
        };

        Ok(Self {
            client: builder.build()?,
            base_url: base_url.to_string(),
            api_key: api.api_key.clone(),
            api_secret: api.api_secret.clone(),
        })
    }

    fn sign(&self, timestamp_ms: i64, body: &str) -> BotResult<String> {
        let payload = format!("{}{}{}{}", timestamp_ms, self.api_key, RECV_WINDOW, body);
        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .map_err(|e| BotError::Signing(e.to_string()))?;
        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

#[async_trait]
impl MarketGateway for BybitGateway {
    async fn fetch_symbol_constraints(&self, symbol: &str) -> BotResult<SymbolConstraints> {
        let url = format!("{}/v5/market/instruments-info", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("category", CATEGORY), ("symbol", symbol)])
            .send()
            .await?
            .error_for_status()?;

        let envelope: Envelope<InstrumentsResult> = response.json().await?;
        envelope.check()?;

        let instrument = envelope
            .result
            .unwrap_or_default()
            .list
            .into_iter()
            .find(|i| i.symbol == symbol)
            .ok_or_else(|| BotError::SymbolNotFound(symbol.to_string()))?;

        let min_order_qty = parse_decimal(&instrument.lot_size_filter.min_order_qty)?;
        let qty_step = parse_decimal(&instrument.lot_size_filter.qty_step)?;
        Ok(SymbolConstraints::new(min_order_qty, qty_step))
    }

    async fn fetch_last_price(&self, symbol: &str) -> BotResult<PriceQuote> {
        let url = format!("{}/v5/market/tickers", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("category", CATEGORY), ("symbol", symbol)])
            .send()
            .await?
            .error_for_status()?;

        let rate_limit_remaining = response
            .headers()
            .get(LIMIT_STATUS_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u32>().ok());
        if let Some(remaining) = rate_limit_remaining {
            debug!("remaining API request budget: {}", remaining);
        }

        let envelope: Envelope<TickersResult> = response.json().await?;
        envelope.check()?;

        let ticker = envelope
            .result
            .unwrap_or_default()
            .list
            .into_iter()
            .next()
            .ok_or_else(|| BotError::SymbolNotFound(symbol.to_string()))?;

        Ok(PriceQuote {
            last_price: parse_decimal(&ticker.last_price)?,
            rate_limit_remaining,
        })
    }

    async fn place_order(
        &self,
        symbol: &str,
        side: OrderSide,
        qty: f64,
        limit_price: f64,
    ) -> BotResult<OrderAck> {
        let body = serde_json::json!({
            "category": CATEGORY,
            "symbol": symbol,
            "side": side.as_str(),
            "orderType": "Limit",
            "qty": qty.to_string(),
            "price": limit_price.to_string(),
            "timeInForce": "GTC",
        })
        .to_string();

        let timestamp_ms = chrono::Utc::now().timestamp_millis();
        let signature = self.sign(timestamp_ms, &body)?;

        let url = format!("{}/v5/order/create", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("X-BAPI-API-KEY", &self.api_key)
            .header("X-BAPI-TIMESTAMP", timestamp_ms.to_string())
            .header("X-BAPI-RECV-WINDOW", RECV_WINDOW)
            .header("X-BAPI-SIGN", signature)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await?
            .error_for_status()?;

        // Business rejections (non-zero retCode) are surfaced in the ack,
        // not as errors, so the retry layer leaves them alone.
        let envelope: Envelope<serde_json::Value> = response.json().await?;
        Ok(OrderAck {
            ret_code: envelope.ret_code,
            ret_msg: envelope.ret_msg,
        })
    }
}

fn parse_decimal(value: &str) -> BotResult<f64> {
    value
        .parse::<f64>()
        .map_err(|_| BotError::MalformedResponse(format!("bad decimal '{}'", value)))
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(rename = "retCode")]
    ret_code: i64,
    #[serde(rename = "retMsg", default)]
    ret_msg: String,
    #[serde(default)]
    result: Option<T>,
}

impl<T> Envelope<T> {
    /// Treat a non-zero retCode on a data endpoint as a gateway error
    fn check(&self) -> BotResult<()> {
        if self.ret_code != 0 {
            return Err(BotError::Gateway(format!(
                "retCode {}: {}",
                self.ret_code, self.ret_msg
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
struct InstrumentsResult {
    #[serde(default)]
    list: Vec<Instrument>,
}

#[derive(Debug, Deserialize)]
struct Instrument {
    symbol: String,
    #[serde(rename = "lotSizeFilter")]
    lot_size_filter: LotSizeFilter,
}

#[derive(Debug, Deserialize)]
struct LotSizeFilter {
    #[serde(rename = "minOrderQty")]
    min_order_qty: String,
    #[serde(rename = "qtyStep")]
    qty_step: String,
}

#[derive(Debug, Default, Deserialize)]
struct TickersResult {
    #[serde(default)]
    list: Vec<Ticker>,
}

#[derive(Debug, Deserialize)]
struct Ticker {
    #[serde(rename = "lastPrice")]
    last_price: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway() -> BybitGateway {
        let api = ApiConfig {
            api_key: "test-key".into(),
            api_secret: "test-secret".into(),
            proxy_url: None,
        };
        BybitGateway::new(&api, true).unwrap()
    }

    #[test]
    fn test_testnet_base_url() {
        assert_eq!(gateway().base_url, TESTNET_API_URL);

        let api = ApiConfig::default();
        let live = BybitGateway::new(&api, false).unwrap();
        assert_eq!(live.base_url, MAINNET_API_URL);
    }

    #[test]
    fn test_signature_is_deterministic_hex() {
        let gw = gateway();
        let body = r#"{"symbol":"ETHUSDT"}"#;

        let sig_a = gw.sign(1704067200000, body).unwrap();
        let sig_b = gw.sign(1704067200000, body).unwrap();
        assert_eq!(sig_a, sig_b);
        // HMAC-SHA256 hex digest
        assert_eq!(sig_a.len(), 64);
        assert!(sig_a.chars().all(|c| c.is_ascii_hexdigit()));

        // Any input change must change the signature
        assert_ne!(sig_a, gw.sign(1704067200001, body).unwrap());
        assert_ne!(sig_a, gw.sign(1704067200000, "{}").unwrap());
    }

    #[test]
    fn test_parse_instruments_response() {
        let payload = r#"{
            "retCode": 0,
            "retMsg": "OK",
            "result": {
                "category": "linear",
                "list": [{
                    "symbol": "ETHUSDT",
                    "lotSizeFilter": {
                        "maxOrderQty": "1000.000",
                        "minOrderQty": "0.01",
                        "qtyStep": "0.01"
                    }
                }]
            }
        }"#;

        let envelope: Envelope<InstrumentsResult> = serde_json::from_str(payload).unwrap();
        envelope.check().unwrap();

        let result = envelope.result.as_ref().unwrap();
        let instrument = &result.list[0];
        let constraints = SymbolConstraints::new(
            parse_decimal(&instrument.lot_size_filter.min_order_qty).unwrap(),
            parse_decimal(&instrument.lot_size_filter.qty_step).unwrap(),
        );
        assert_eq!(constraints.min_order_qty, 0.01);
        assert_eq!(constraints.qty_step, 0.01);
        assert_eq!(constraints.qty_precision, 2);
    }

    #[test]
    fn test_parse_tickers_response() {
        let payload = r#"{
            "retCode": 0,
            "retMsg": "OK",
            "result": {
                "category": "linear",
                "list": [{"symbol": "ETHUSDT", "lastPrice": "1499.85"}]
            }
        }"#;

        let envelope: Envelope<TickersResult> = serde_json::from_str(payload).unwrap();
        envelope.check().unwrap();
        let result = envelope.result.as_ref().unwrap();
        assert_eq!(parse_decimal(&result.list[0].last_price).unwrap(), 1499.85);
    }

    #[test]
    fn test_error_envelope_rejected() {
        let payload = r#"{"retCode": 10001, "retMsg": "params error", "result": {}}"#;
        let envelope: Envelope<TickersResult> = serde_json::from_str(payload).unwrap();
        let err = envelope.check().unwrap_err();
        assert!(err.to_string().contains("params error"));
    }

    #[test]
    fn test_parse_decimal_rejects_garbage() {
        assert!(parse_decimal("0.001").is_ok());
        assert!(parse_decimal("").is_err());
        assert!(parse_decimal("abc").is_err());
    }
}
