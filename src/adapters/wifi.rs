//! WiFi station-mode adapter.
//!
//! Credentials are baked in at build time (`WIFI_SSID`, `WIFI_PASS`).
//! [`connect_station`] blocks until the netif has an address; after that a
//! supervisor thread watches the link and reconnects on loss.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF WiFi driver via `esp_idf_svc::wifi`.
//! - **all other targets**: credential validation and backoff only.
//!
//! ## Reconnection policy
//!
//! On disconnect the supervisor waits an exponential backoff (2 s → 4 s →
//! 8 s … capped at 60 s) before retrying.

use core::fmt;

// ───────────────────────────────────────────────────────────────
// Credentials
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialsError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
}

impl fmt::Display for CredentialsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured (set WIFI_SSID at build time)"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)"),
        }
    }
}

/// Validated station credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiCredentials {
    pub ssid: heapless::String<32>,
    pub password: heapless::String<64>,
}

impl WifiCredentials {
    pub fn new(ssid: &str, password: &str) -> Result<Self, CredentialsError> {
        validate_ssid(ssid)?;
        validate_password(password)?;
        let mut creds = Self {
            ssid: heapless::String::new(),
            password: heapless::String::new(),
        };
        creds.ssid.push_str(ssid).map_err(|_| CredentialsError::InvalidSsid)?;
        creds
            .password
            .push_str(password)
            .map_err(|_| CredentialsError::InvalidPassword)?;
        Ok(creds)
    }

    /// Credentials compiled into the firmware image.
    pub fn from_build_env() -> Result<Self, CredentialsError> {
        let ssid = option_env!("WIFI_SSID").ok_or(CredentialsError::NoCredentials)?;
        Self::new(ssid, option_env!("WIFI_PASS").unwrap_or(""))
    }

    pub fn is_open(&self) -> bool {
        self.password.is_empty()
    }
}

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn validate_ssid(ssid: &str) -> Result<(), CredentialsError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(CredentialsError::InvalidSsid);
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), CredentialsError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(CredentialsError::InvalidPassword);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// Reconnect backoff
// ───────────────────────────────────────────────────────────────

const MIN_BACKOFF_SECS: u32 = 2;
const MAX_BACKOFF_SECS: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    secs: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self { secs: MIN_BACKOFF_SECS }
    }
}

impl Backoff {
    /// Delay before the next attempt; doubles the one after, capped.
    pub fn next_delay_secs(&mut self) -> u32 {
        let current = self.secs;
        self.secs = (self.secs * 2).min(MAX_BACKOFF_SECS);
        current
    }

    pub fn reset(&mut self) {
        self.secs = MIN_BACKOFF_SECS;
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF station
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub use station::{connect_station, spawn_supervisor};

#[cfg(target_os = "espidf")]
mod station {
    use std::time::Duration;

    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::hal::modem::Modem;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};
    use log::{error, info, warn};

    use super::{Backoff, WifiCredentials};
    use crate::drivers::task_pin::{Core, spawn_on_core};
    use crate::error::CommsError;

    const LINK_CHECK_PERIOD: Duration = Duration::from_secs(5);

    fn wifi_err(stage: &'static str) -> impl Fn(esp_idf_svc::sys::EspError) -> CommsError {
        move |e| {
            error!("WiFi: {stage} failed: {e}");
            CommsError::WifiConnectFailed
        }
    }

    /// Bring up the station interface and block until it has an address.
    pub fn connect_station(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
        creds: &WifiCredentials,
    ) -> Result<BlockingWifi<EspWifi<'static>>, CommsError> {
        let esp_wifi = EspWifi::new(modem, sysloop.clone(), Some(nvs)).map_err(wifi_err("driver init"))?;
        let mut wifi = BlockingWifi::wrap(esp_wifi, sysloop).map_err(wifi_err("event wrap"))?;

        wifi.set_configuration(&Configuration::Client(ClientConfiguration {
            ssid: creds.ssid.clone(),
            password: creds.password.clone(),
            auth_method: if creds.is_open() { AuthMethod::None } else { AuthMethod::WPA2Personal },
            ..Default::default()
        }))
        .map_err(wifi_err("configuration"))?;

        wifi.start().map_err(wifi_err("start"))?;
        info!("WiFi: connecting to '{}'", creds.ssid);
        wifi.connect().map_err(wifi_err("connect"))?;
        wifi.wait_netif_up().map_err(wifi_err("netif up"))?;

        if let Ok(ip) = wifi.wifi().sta_netif().get_ip_info() {
            info!("WiFi: connected, ip={}", ip.ip);
        }
        Ok(wifi)
    }

    /// Take ownership of the station and keep it connected forever.
    pub fn spawn_supervisor(mut wifi: BlockingWifi<EspWifi<'static>>) -> std::io::Result<()> {
        spawn_on_core(Core::Pro, 4, 4, "wifi-sup\0", move || {
            let mut backoff = Backoff::default();
            loop {
                std::thread::sleep(LINK_CHECK_PERIOD);
                if wifi.is_connected().unwrap_or(false) {
                    backoff.reset();
                    continue;
                }

                let delay = backoff.next_delay_secs();
                warn!("WiFi: link lost, reconnecting in {delay}s");
                std::thread::sleep(Duration::from_secs(u64::from(delay)));
                match wifi.connect().and_then(|()| wifi.wait_netif_up()) {
                    Ok(()) => info!("WiFi: reconnected"),
                    Err(e) => error!("WiFi: reconnect failed: {e}"),
                }
            }
        })
        .map(|_| ())
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
