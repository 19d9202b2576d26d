//! Regional deployments of the open platform.
//!
//! All regions expose identical endpoints under different hosts. The
//! token endpoint always lives on the region host; overseas tokens also
//! carry an `areaDomain` that becomes the API base (see
//! [`crate::client::EzvizClient`]).

use std::fmt;
use std::str::FromStr;

use crate::error::EzvizError;

/// One of the eight supported regional deployments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Region {
    /// Mainland China (Ys7).
    #[default]
    Cn,
    /// Global English deployment.
    En,
    /// Europe.
    Eu,
    /// North America.
    Us,
    /// South America.
    Sa,
    /// Singapore.
    Sg,
    /// India.
    In,
    /// Russia.
    Ru,
}

impl Region {
    /// Every supported region, in declaration order.
    pub const ALL: [Region; 8] = [
        Region::Cn,
        Region::En,
        Region::Eu,
        Region::Us,
        Region::Sa,
        Region::Sg,
        Region::In,
        Region::Ru,
    ];

    /// Short region code as accepted by [`Region::from_str`].
    pub fn code(self) -> &'static str {
        match self {
            Region::Cn => "cn",
            Region::En => "en",
            Region::Eu => "eu",
            Region::Us => "us",
            Region::Sa => "sa",
            Region::Sg => "sg",
            Region::In => "in",
            Region::Ru => "ru",
        }
    }

    /// Host name of the regional deployment.
    pub fn host(self) -> &'static str {
        match self {
            Region::Cn => "open.ys7.com",
            Region::En => "open.ezvizlife.com",
            Region::Eu => "ieuopen.ezvizlife.com",
            Region::Us => "iusopen.ezvizlife.com",
            Region::Sa => "isaopen.ezvizlife.com",
            Region::Sg => "isgpopen.ezvizlife.com",
            Region::In => "iindiaopen.ezvizlife.com",
            Region::Ru => "irusopen.ezvizlife.com",
        }
    }

    /// API base URL used before a token has supplied an `areaDomain`.
    /// Always ends with `/`.
    pub fn base_url(self) -> String {
        format!("https://{}/", self.host())
    }

    /// Token endpoint for this region.
    pub fn token_url(self) -> String {
        format!("https://{}/api/lapp/token/get", self.host())
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Region {
    type Err = EzvizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_lowercase();
        Region::ALL
            .into_iter()
            .find(|r| r.code() == code)
            .ok_or_else(|| EzvizError::Config(format!("unsupported region code: {s:?}")))
    }
}
