mod common;

use rustls::client::danger::ServerCertVerifier;
use rustls::pki_types::{ServerName, UnixTime};

use outbound_client::tls::{
    debug_text, parse_pem_certificates, resolve_trust, sha1_fingerprint, CertificateInfo, TlsError,
};
use outbound_client::{AppSettings, ClientConfiguration, TrustManagerType};

fn name(host: &str) -> ServerName<'static> {
    ServerName::try_from(host).expect("server name").to_owned()
}

#[test]
fn test_promiscuous_accepts_wrong_host_with_hostname_flag_on() {
    let identity = common::self_signed(&["localhost"]);
    let settings = AppSettings::default().with_hostname_verification(true);
    let trust = resolve_trust(
        &settings,
        &ClientConfiguration::with_trust(TrustManagerType::Promiscuous),
    )
    .expect("promiscuous trust");

    assert!(!trust.hostname_verification);
    trust
        .verifier
        .verify_server_cert(&identity.cert, &[], &name("wrong.example.org"), &[], UnixTime::now())
        .expect("any chain accepted");
}

#[test]
fn test_pinned_accepts_exact_certificate_only() {
    let pinned = common::self_signed(&["localhost"]);
    let stranger = common::self_signed(&["localhost"]);
    let config = ClientConfiguration::builder()
        .trust_manager_type(TrustManagerType::ConfiguredCertificates)
        .pinned_certificate(pinned.cert.clone())
        .build();
    let trust = resolve_trust(&AppSettings::default(), &config).expect("pinned trust");

    trust
        .verifier
        .verify_server_cert(&pinned.cert, &[], &name("localhost"), &[], UnixTime::now())
        .expect("pinned certificate accepted");
    let rejected = trust
        .verifier
        .verify_server_cert(&stranger.cert, &[], &name("localhost"), &[], UnixTime::now());
    assert!(rejected.is_err());
}

#[test]
fn test_pinned_hostname_follows_application_flag() {
    let pinned = common::self_signed(&["localhost"]);
    let config = ClientConfiguration::builder()
        .trust_manager_type(TrustManagerType::ConfiguredCertificates)
        .pinned_certificate(pinned.cert.clone())
        .build();

    let strict = resolve_trust(&AppSettings::default(), &config).expect("strict");
    assert!(strict
        .verifier
        .verify_server_cert(&pinned.cert, &[], &name("other.example"), &[], UnixTime::now())
        .is_err());

    let relaxed = resolve_trust(
        &AppSettings::default().with_hostname_verification(false),
        &config,
    )
    .expect("relaxed");
    assert!(relaxed
        .verifier
        .verify_server_cert(&pinned.cert, &[], &name("other.example"), &[], UnixTime::now())
        .is_ok());
}

#[test]
fn test_pinned_without_certificates_is_a_configuration_error() {
    let err = resolve_trust(
        &AppSettings::default(),
        &ClientConfiguration::with_trust(TrustManagerType::ConfiguredCertificates),
    )
    .expect_err("no pinned certificates");
    assert!(matches!(err, TlsError::MissingPinnedCertificates));
    assert!(outbound_client::Error::from(err).is_configuration());
}

#[test]
fn test_certificate_reader_captures_chain() {
    let identity = common::self_signed(&["localhost"]);
    let trust = resolve_trust(
        &AppSettings::default(),
        &ClientConfiguration::with_trust(TrustManagerType::PromiscuousCertReader),
    )
    .expect("reader trust");

    assert!(trust.captured_certificates().is_empty());
    trust
        .verifier
        .verify_server_cert(&identity.cert, &[], &name("localhost"), &[], UnixTime::now())
        .expect("accepted");
    trust
        .verifier
        .verify_server_cert(&identity.cert, &[], &name("localhost"), &[], UnixTime::now())
        .expect("accepted again");

    assert_eq!(trust.captured_certificates(), vec![identity.cert.clone()]);
}

#[test]
fn test_certificate_reader_checks_hostname_but_still_captures() {
    let identity = common::self_signed(&["localhost"]);
    let trust = resolve_trust(
        &AppSettings::default(),
        &ClientConfiguration::with_trust(TrustManagerType::PromiscuousCertReader),
    )
    .expect("reader trust");

    let result = trust
        .verifier
        .verify_server_cert(&identity.cert, &[], &name("elsewhere.example"), &[], UnixTime::now());
    assert!(result.is_err());
    assert_eq!(trust.captured_certificates().len(), 1);
}

#[test]
fn test_default_trust_rejects_self_signed() {
    let identity = common::self_signed(&["localhost"]);
    for hostname_verification in [true, false] {
        let trust = resolve_trust(
            &AppSettings::default().with_hostname_verification(hostname_verification),
            &ClientConfiguration::with_trust(TrustManagerType::DefaultTrust),
        )
        .expect("default trust");
        let result = trust
            .verifier
            .verify_server_cert(&identity.cert, &[], &name("localhost"), &[], UnixTime::now());
        assert!(result.is_err(), "self-signed certificate must not chain to a root");
    }
}

#[test]
fn test_hostname_flag_disabled_only_when_asked() {
    let settings = AppSettings::default();
    for trust_type in [
        TrustManagerType::PromiscuousCertReader,
        TrustManagerType::DefaultTrust,
    ] {
        let trust = resolve_trust(&settings, &ClientConfiguration::with_trust(trust_type))
            .expect("trust");
        assert!(trust.hostname_verification, "{trust_type}");
    }

    let trust = resolve_trust(
        &settings.with_hostname_verification(false),
        &ClientConfiguration::with_trust(TrustManagerType::DefaultTrust),
    )
    .expect("trust");
    assert!(!trust.hostname_verification);
}

#[test]
fn test_debug_text_lists_fingerprints_only() {
    let a = common::self_signed(&["a.example"]);
    let b = common::self_signed(&["b.example"]);

    assert_eq!(
        debug_text(&ClientConfiguration::with_trust(TrustManagerType::Promiscuous)),
        "trust=promiscuous"
    );

    let config = ClientConfiguration::builder()
        .trust_manager_type(TrustManagerType::ConfiguredCertificates)
        .pinned_certificates([a.cert.clone(), b.cert.clone()])
        .build();
    let text = debug_text(&config);
    assert_eq!(
        text,
        format!(
            "trust=configuredCertificates certificates=[{},{}]",
            sha1_fingerprint(&a.cert),
            sha1_fingerprint(&b.cert)
        )
    );
    assert!(!text.contains("BEGIN CERTIFICATE"));
}

#[test]
fn test_pem_parsing_and_certificate_info() {
    let identity = common::self_signed(&["localhost", "svc.example"]);
    let parsed = parse_pem_certificates(&identity.pem).expect("parse pem");
    assert_eq!(parsed, vec![identity.cert.clone()]);

    let info = CertificateInfo::from_der(&parsed[0]).expect("certificate info");
    assert!(info.dns_names.iter().any(|n| n == "svc.example"));
    assert_eq!(info.sha1, sha1_fingerprint(&identity.cert));

    assert!(parse_pem_certificates("not a certificate").is_err());
}
