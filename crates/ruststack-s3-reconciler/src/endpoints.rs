//! Derived bucket attributes that come from static tables, not the API.

use ruststack_core::{AwsRegion, Partition};

/// Regions whose website endpoint uses the legacy `s3-website-{region}` form.
const LEGACY_WEBSITE_REGIONS: &[&str] = &[
    "ap-northeast-1",
    "ap-southeast-1",
    "ap-southeast-2",
    "eu-west-1",
    "sa-east-1",
    "us-east-1",
    "us-gov-west-1",
    "us-west-1",
    "us-west-2",
];

/// Route 53 hosted zone of the S3 website endpoint per region.
const HOSTED_ZONES: &[(&str, &str)] = &[
    ("ap-east-1", "ZNB98KWMFR0R6"),
    ("ap-northeast-1", "Z2M4EHUR26P7ZW"),
    ("ap-northeast-2", "Z3W03O7B5YMIYP"),
    ("ap-northeast-3", "Z2YQB5RD63NC85"),
    ("ap-south-1", "Z11RGJOFQNVJUP"),
    ("ap-southeast-1", "Z3O0J2DXBE1FTB"),
    ("ap-southeast-2", "Z1WCIGYICN2BYD"),
    ("ca-central-1", "Z1QDHH18159H29"),
    ("cn-north-1", "Z5CN8UMXT92WN"),
    ("cn-northwest-1", "Z282HJ1KT0DH03"),
    ("eu-central-1", "Z21DNDUVLTQW6Q"),
    ("eu-north-1", "Z3BAZG2TWCNX0D"),
    ("eu-west-1", "Z1BKCTXD74EZPE"),
    ("eu-west-2", "Z3GKZC51ZF0DB4"),
    ("eu-west-3", "Z3R1K369G5AVDG"),
    ("me-south-1", "Z1MPMWCPA7YB62"),
    ("sa-east-1", "Z7KQH4QJS55SO"),
    ("us-east-1", "Z3AQBSTGFYJSTF"),
    ("us-east-2", "Z2O1EMRO9K5GLX"),
    ("us-gov-east-1", "Z31GFT0UA1I2HV"),
    ("us-gov-west-1", "Z31GFT0UA1I2HV"),
    ("us-west-1", "Z2F56UZL2M1ACD"),
    ("us-west-2", "Z3BJ6K6RIION7M"),
];

/// Global virtual-hosted domain name of a bucket.
#[must_use]
pub fn bucket_domain_name(bucket: &str) -> String {
    format!("{bucket}.s3.amazonaws.com")
}

/// Region-qualified virtual-hosted domain name of a bucket.
///
/// The home region keeps the global endpoint.
#[must_use]
pub fn bucket_regional_domain_name(bucket: &str, region: &AwsRegion) -> String {
    if region.is_home() {
        return bucket_domain_name(bucket);
    }
    format!(
        "{bucket}.s3.{region}.{}",
        region.partition().dns_suffix()
    )
}

/// Hosted zone ID for a region, if the region is known.
#[must_use]
pub fn hosted_zone_id(region: &AwsRegion) -> Option<&'static str> {
    HOSTED_ZONES
        .iter()
        .find(|(r, _)| *r == region.as_str())
        .map(|(_, zone)| *zone)
}

/// Website domain of a region.
///
/// ```
/// use ruststack_core::AwsRegion;
/// use ruststack_s3_reconciler::endpoints::website_domain;
///
/// assert_eq!(website_domain(&AwsRegion::new("us-west-2")), "s3-website-us-west-2.amazonaws.com");
/// assert_eq!(website_domain(&AwsRegion::new("eu-central-1")), "s3-website.eu-central-1.amazonaws.com");
/// assert_eq!(website_domain(&AwsRegion::new("cn-north-1")), "s3-website.cn-north-1.amazonaws.com.cn");
/// ```
#[must_use]
pub fn website_domain(region: &AwsRegion) -> String {
    if LEGACY_WEBSITE_REGIONS.contains(&region.as_str()) {
        return format!("s3-website-{region}.amazonaws.com");
    }
    match region.partition() {
        Partition::AwsCn => format!("s3-website.{region}.amazonaws.com.cn"),
        Partition::Aws | Partition::AwsUsGov => format!("s3-website.{region}.amazonaws.com"),
    }
}

/// Website endpoint of a bucket.
#[must_use]
pub fn website_endpoint(bucket: &str, region: &AwsRegion) -> String {
    format!("{bucket}.{}", website_domain(region))
}
