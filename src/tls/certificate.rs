use rustls::pki_types::CertificateDer;
use x509_parser::parse_x509_certificate;

/// Collects subject organisation names from a peer chain.
///
/// One entry per certificate that names at least one organisation, multiple
/// values of the same certificate joined with `", "`. Certificates that fail to
/// parse are skipped.
pub fn organization_names(chain: &[CertificateDer<'_>]) -> Vec<String> {
    chain
        .iter()
        .filter_map(|der| match parse_x509_certificate(der.as_ref()) {
            Ok((_, cert)) => {
                let orgs: Vec<&str> = cert
                    .subject()
                    .iter_organization()
                    .filter_map(|attr| attr.as_str().ok())
                    .filter(|org| !org.is_empty())
                    .collect();
                (!orgs.is_empty()).then(|| orgs.join(", "))
            }
            Err(e) => {
                log::debug!("Skipping unparsable peer certificate: {e}");
                None
            }
        })
        .collect()
}
