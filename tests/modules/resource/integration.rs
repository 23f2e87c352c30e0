//! 资源标识集成测试

use meterer::error::MetererError;
use meterer::resource::{parse_resource_uri, ResourceLocation};

#[test]
fn test_parse_valid_uri() {
    let (bucket, key) = parse_resource_uri("s3://bucketname/key1").unwrap();
    assert_eq!(bucket, "bucketname");
    assert_eq!(key, "key1");
}

#[test]
fn test_key_characters_are_not_normalised() {
    let loc: ResourceLocation = "s3://my.bucket-01/a//b/c d?x=1".parse().unwrap();
    assert_eq!(loc.bucket, "my.bucket-01");
    assert_eq!(loc.key, "a//b/c d?x=1");
    assert_eq!(loc.to_string(), "s3://my.bucket-01/a//b/c d?x=1");
}

#[test]
fn test_rejected_identifiers() {
    let cases = [
        "/foo/bar",
        "s3:///bar",
        "s3://foo",
        "s3://foo/",
        "http://foo/bar",
        "s3:/foo/bar",
        "",
    ];
    for uri in cases {
        let err = parse_resource_uri(uri).unwrap_err();
        assert!(
            matches!(err, MetererError::InvalidResourceUri(_)),
            "{} -> {:?}",
            uri,
            err
        );
        assert_eq!(err.stage(), "parse");
    }
}
