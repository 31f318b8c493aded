//! Cloud endpoint URLs

use serde::{Deserialize, Serialize};

/// Base URLs of the cloud services the bridge talks to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudEndpoints {
    /// Smart-home API host
    #[serde(default = "default_iot_base")]
    pub iot_base: String,

    /// Speaker platform host (online stats)
    #[serde(default = "default_quasar_base")]
    pub quasar_base: String,

    /// Authenticated page carrying the CSRF token
    #[serde(default = "default_csrf_page")]
    pub csrf_page: String,

    /// Passport (login) host
    #[serde(default = "default_passport_base")]
    pub passport_base: String,
}

fn default_iot_base() -> String {
    "https://iot.quasar.yandex.ru".to_string()
}

fn default_quasar_base() -> String {
    "https://quasar.yandex.ru".to_string()
}

fn default_csrf_page() -> String {
    "https://yandex.ru/quasar/iot".to_string()
}

fn default_passport_base() -> String {
    "https://passport.yandex.ru".to_string()
}

impl Default for CloudEndpoints {
    fn default() -> Self {
        Self {
            iot_base: default_iot_base(),
            quasar_base: default_quasar_base(),
            csrf_page: default_csrf_page(),
            passport_base: default_passport_base(),
        }
    }
}

impl CloudEndpoints {
    /// All endpoints rooted at a single host, used against mock servers
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            iot_base: format!("{base}/iot"),
            quasar_base: format!("{base}/quasar"),
            csrf_page: format!("{base}/quasar/iot"),
            passport_base: format!("{base}/passport"),
        }
    }

    fn iot(&self, path: &str) -> String {
        format!("{}{}", self.iot_base.trim_end_matches('/'), path)
    }

    pub fn devices(&self) -> String {
        self.iot("/m/user/devices")
    }

    pub fn device(&self, iot_id: &str) -> String {
        self.iot(&format!("/m/user/devices/{iot_id}"))
    }

    pub fn device_actions(&self, iot_id: &str) -> String {
        self.iot(&format!("/m/user/devices/{iot_id}/actions"))
    }

    pub fn scenarios(&self) -> String {
        self.iot("/m/user/scenarios")
    }

    /// Creation endpoint; the trailing slash is significant to the cloud
    pub fn scenario_create(&self) -> String {
        self.iot("/m/user/scenarios/")
    }

    pub fn scenario(&self, scenario_id: &str) -> String {
        self.iot(&format!("/m/user/scenarios/{scenario_id}"))
    }

    pub fn scenario_actions(&self, scenario_id: &str) -> String {
        self.iot(&format!("/m/user/scenarios/{scenario_id}/actions"))
    }

    pub fn online_stats(&self) -> String {
        format!(
            "{}/devices_online_stats",
            self.quasar_base.trim_end_matches('/')
        )
    }

    pub fn passport_am(&self) -> String {
        format!(
            "{}/am?app_platform=android",
            self.passport_base.trim_end_matches('/')
        )
    }

    pub fn passport_submit(&self) -> String {
        format!(
            "{}/registration-validations/auth/password/submit",
            self.passport_base.trim_end_matches('/')
        )
    }

    pub fn passport_profile(&self) -> String {
        format!("{}/profile", self.passport_base.trim_end_matches('/'))
    }

    pub fn passport_magic_status(&self) -> String {
        format!(
            "{}/auth/magic/status/",
            self.passport_base.trim_end_matches('/')
        )
    }

    pub fn qr_code_url(&self, track_id: &str) -> String {
        format!(
            "{}/auth/magic/code/?track_id={}",
            self.passport_base.trim_end_matches('/'),
            track_id
        )
    }
}
