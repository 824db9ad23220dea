use std::sync::Arc;
use std::time::Duration;

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, TimeDelta, Utc};
use intake_crypto::RsaPublicKey;
use intake_protocol::{CertificateUsage, PemCertificateInfo};
use rand::Rng;

use crate::CertError;
use crate::cache::CacheConfig;

/// A parsed server certificate.
#[derive(Debug, Clone)]
pub struct CachedCertificate {
    pub usage: CertificateUsage,
    /// DER bytes as received.
    pub der: Vec<u8>,
    pub public_key: RsaPublicKey,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
}

impl CachedCertificate {
    /// SHA-256 fingerprint of the DER bytes, for logs.
    pub fn fingerprint(&self) -> String {
        intake_crypto::fingerprint_hex(&self.der)
    }
}

/// The certificate pair in use, replaced as a unit on each refresh.
#[derive(Debug, Clone)]
pub struct CertificateMaterials {
    pub symmetric_key_cert: Arc<CachedCertificate>,
    pub token_cert: Arc<CachedCertificate>,
    /// Earliest expiry of the two certificates.
    pub expires_at: DateTime<Utc>,
    /// When the background task should fetch again.
    pub refresh_at: DateTime<Utc>,
}

impl CertificateMaterials {
    /// Builds materials from a certificate listing.
    ///
    /// When several certificates share a usage, the one with the earliest
    /// `valid_from` wins.
    pub fn from_listing(
        listing: &[PemCertificateInfo],
        config: &CacheConfig,
        now: DateTime<Utc>,
    ) -> Result<Self, CertError> {
        let symmetric_key_cert = select(listing, CertificateUsage::SymmetricKeyEncryption)?;
        let token_cert = select(listing, CertificateUsage::TokenEncryption)?;

        let expires_at = symmetric_key_cert.valid_to.min(token_cert.valid_to);
        let jitter = if config.max_jitter.is_zero() {
            Duration::ZERO
        } else {
            let max_ms = config.max_jitter.as_millis() as u64;
            Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
        };
        let refresh_at = compute_refresh_at(expires_at, now, config, jitter);

        Ok(Self {
            symmetric_key_cert: Arc::new(symmetric_key_cert),
            token_cert: Arc::new(token_cert),
            expires_at,
            refresh_at,
        })
    }

    /// Whether these materials may still be served after a failed refresh.
    pub fn within_stale_grace(&self, now: DateTime<Utc>, grace: Duration) -> bool {
        self.expires_at
            .checked_add_signed(to_time_delta(grace))
            .is_none_or(|limit| now <= limit)
    }

    /// Time left until `refresh_at`, zero if it has passed.
    pub fn until_refresh(&self, now: DateTime<Utc>) -> Duration {
        (self.refresh_at - now).to_std().unwrap_or(Duration::ZERO)
    }
}

/// `min(expires_at - safety_margin, now + max_refresh_horizon) - jitter`.
pub(crate) fn compute_refresh_at(
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
    config: &CacheConfig,
    jitter: Duration,
) -> DateTime<Utc> {
    let by_expiry = expires_at
        .checked_sub_signed(to_time_delta(config.safety_margin))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let by_horizon = now
        .checked_add_signed(to_time_delta(config.max_refresh_horizon))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    let earliest = by_expiry.min(by_horizon);
    earliest
        .checked_sub_signed(to_time_delta(jitter))
        .unwrap_or(earliest)
}

fn select(
    listing: &[PemCertificateInfo],
    usage: CertificateUsage,
) -> Result<CachedCertificate, CertError> {
    let info = listing
        .iter()
        .filter(|c| c.has_usage(usage))
        .min_by_key(|c| c.valid_from)
        .ok_or(CertError::MissingUsage(usage))?;

    let der = STANDARD
        .decode(info.certificate.trim())
        .map_err(|e| CertError::Encoding {
            usage,
            message: e.to_string(),
        })?;
    let public_key = intake_crypto::public_key_from_certificate(&der)
        .map_err(|source| CertError::InvalidCertificate { usage, source })?;

    Ok(CachedCertificate {
        usage,
        der,
        public_key,
        valid_from: info.valid_from,
        valid_to: info.valid_to,
    })
}

fn to_time_delta(d: Duration) -> TimeDelta {
    TimeDelta::from_std(d).unwrap_or(TimeDelta::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use intake_crypto::test_support;

    fn info(usage: Vec<CertificateUsage>, from_days: i64, to_days: i64) -> PemCertificateInfo {
        let base = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        PemCertificateInfo {
            certificate: test_support::certificate_base64(),
            valid_from: base + TimeDelta::days(from_days),
            valid_to: base + TimeDelta::days(to_days),
            usage,
        }
    }

    fn no_jitter() -> CacheConfig {
        CacheConfig {
            max_jitter: Duration::ZERO,
            ..CacheConfig::default()
        }
    }

    #[test]
    fn picks_earliest_valid_from_per_usage() {
        let listing = vec![
            info(vec![CertificateUsage::SymmetricKeyEncryption], 10, 400),
            info(vec![CertificateUsage::SymmetricKeyEncryption], 0, 300),
            info(vec![CertificateUsage::TokenEncryption], 5, 200),
        ];
        let now = listing[1].valid_from;
        let m = CertificateMaterials::from_listing(&listing, &no_jitter(), now).unwrap();
        assert_eq!(m.symmetric_key_cert.valid_from, listing[1].valid_from);
        assert_eq!(m.token_cert.valid_to, listing[2].valid_to);
        // Expiry is the earlier of the two.
        assert_eq!(m.expires_at, listing[2].valid_to);
    }

    #[test]
    fn one_certificate_may_serve_both_usages() {
        let listing = vec![info(
            vec![
                CertificateUsage::SymmetricKeyEncryption,
                CertificateUsage::TokenEncryption,
            ],
            0,
            30,
        )];
        let m = CertificateMaterials::from_listing(&listing, &no_jitter(), Utc::now()).unwrap();
        assert_eq!(m.symmetric_key_cert.der, m.token_cert.der);
        assert_eq!(m.symmetric_key_cert.der, test_support::certificate_der());
    }

    #[test]
    fn missing_usage_is_an_error() {
        let listing = vec![info(vec![CertificateUsage::SymmetricKeyEncryption], 0, 30)];
        let err = CertificateMaterials::from_listing(&listing, &no_jitter(), Utc::now())
            .unwrap_err();
        assert!(matches!(
            err,
            CertError::MissingUsage(CertificateUsage::TokenEncryption)
        ));
    }

    #[test]
    fn malformed_certificate_is_rejected() {
        let mut bad = info(
            vec![
                CertificateUsage::SymmetricKeyEncryption,
                CertificateUsage::TokenEncryption,
            ],
            0,
            30,
        );
        bad.certificate = "not base64!".into();
        let err =
            CertificateMaterials::from_listing(&[bad.clone()], &no_jitter(), Utc::now()).unwrap_err();
        assert!(matches!(err, CertError::Encoding { .. }));

        bad.certificate = "AAAA".into();
        let err = CertificateMaterials::from_listing(&[bad], &no_jitter(), Utc::now()).unwrap_err();
        assert!(matches!(err, CertError::InvalidCertificate { .. }));
    }

    #[test]
    fn refresh_at_is_capped_to_horizon() {
        let now = Utc::now();
        let config = no_jitter();
        // Expiry far away: next refresh is 24h from now.
        let far = now + TimeDelta::days(365);
        assert_eq!(
            compute_refresh_at(far, now, &config, Duration::ZERO),
            now + TimeDelta::hours(24)
        );
        // Expiry within two days: one day before expiry.
        let near = now + TimeDelta::hours(36);
        assert_eq!(
            compute_refresh_at(near, now, &config, Duration::ZERO),
            now + TimeDelta::hours(12)
        );
    }

    #[test]
    fn jitter_moves_refresh_earlier_within_bound() {
        let now = Utc::now();
        let listing = vec![info(
            vec![
                CertificateUsage::SymmetricKeyEncryption,
                CertificateUsage::TokenEncryption,
            ],
            0,
            100_000,
        )];
        let config = CacheConfig::default();
        let latest = now + TimeDelta::hours(24);
        let earliest = latest - TimeDelta::minutes(5);
        for _ in 0..50 {
            let m = CertificateMaterials::from_listing(&listing, &config, now).unwrap();
            assert!(m.refresh_at <= latest && m.refresh_at >= earliest);
        }
    }

    #[test]
    fn stale_grace_window() {
        let listing = vec![info(
            vec![
                CertificateUsage::SymmetricKeyEncryption,
                CertificateUsage::TokenEncryption,
            ],
            0,
            30,
        )];
        let m = CertificateMaterials::from_listing(&listing, &no_jitter(), Utc::now()).unwrap();
        let grace = Duration::from_secs(6 * 3600);
        assert!(m.within_stale_grace(m.expires_at + TimeDelta::hours(5), grace));
        assert!(!m.within_stale_grace(m.expires_at + TimeDelta::hours(7), grace));
    }
}
