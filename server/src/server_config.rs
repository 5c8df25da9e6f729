use config::Config;
use lazy_static::lazy_static;
use serde::Deserialize;
use std::{env, path::Path};

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub id: String,
    pub temperature: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LimiterConfig {
    pub failure_threshold: u32,
    pub reset_timeout_ms: u64,
    pub min_interval_ms: u64,
    pub request_timeout_ms: u64,
    pub max_attempts: u32,
    pub queue_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackoffConfig {
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_factor: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
    pub from_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushGatewayConfig {
    pub endpoint: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    pub batch_concurrency: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CampaignConfig {
    pub recipient_cap: u64,
    pub sweep_limit: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AutomationConfig {
    pub sweep_limit: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuietHoursConfig {
    pub start_hour: u32,
    pub end_hour: u32,
    pub timezone: String,
    pub flush_hour: u32,
    pub flush_limit: u64,
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    api: ApiConfig,
    model: ModelConfig,
    limiter: LimiterConfig,
    backoff: BackoffConfig,
    smtp: SmtpConfig,
    push: PushGatewayConfig,
    dispatch: DispatchConfig,
    campaign: CampaignConfig,
    automation: AutomationConfig,
    quiet_hours: QuietHoursConfig,
}

#[derive(Debug)]
pub struct ServerConfig {
    pub api: ApiConfig,
    pub model: ModelConfig,
    pub limiter: LimiterConfig,
    pub backoff: BackoffConfig,
    pub smtp: SmtpConfig,
    pub push: PushGatewayConfig,
    pub dispatch: DispatchConfig,
    pub campaign: CampaignConfig,
    pub automation: AutomationConfig,
    pub quiet_hours: QuietHoursConfig,
}

impl std::fmt::Display for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Server Config:\nModel: {:?}\n\nLimiter: {:?}\n\nBackoff: {:?}\n\nSMTP host: {} from: {}\n\nPush endpoint: {}\n\nDispatch: {:?}\n\nCampaign: {:?}\n\nAutomation: {:?}\n\nQuiet Hours: {:?}",
            self.model,
            self.limiter,
            self.backoff,
            self.smtp.host,
            self.smtp.from_address,
            self.push.endpoint,
            self.dispatch,
            self.campaign,
            self.automation,
            self.quiet_hours,
        )
    }
}

lazy_static! {
    pub static ref cfg: ServerConfig = {
        let root = env::var("APP_DIR").unwrap_or_else(|_| {
            let dir =
                env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR or APP_DIR is required");
            let dir = Path::new(&dir).parent().unwrap().display().to_string();
            format!("{}/config", dir)
        });
        let path = format!("{root}/config.toml");
        let cfg_file: ConfigFile = Config::builder()
            .add_source(config::File::with_name(&path))
            .build()
            .expect("config.toml is required")
            .try_deserialize()
            .expect("config.toml is invalid");

        let ConfigFile {
            api,
            model,
            limiter,
            backoff,
            smtp,
            push,
            dispatch,
            campaign,
            automation,
            quiet_hours,
        } = cfg_file;

        let api = ApiConfig {
            key: env::var("AI_API_KEY").unwrap_or(api.key),
        };

        ServerConfig {
            api,
            model,
            limiter,
            backoff,
            smtp,
            push,
            dispatch,
            campaign,
            automation,
            quiet_hours,
        }
    };
}
