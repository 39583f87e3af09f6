#![feature(test)]

extern crate test;

use base64ct::{Base64, Encoding};
use rsa_keyblob::{decode_private_key, probe_public_key, RsaHelper, SignatureAlgorithm};
use test::Bencher;

const RSA_2048_PRIV: &str = include_str!("../tests/examples/rsa2048-priv.b64");
const RSA_2048_PUB: &str = include_str!("../tests/examples/rsa2048-pub.b64");
const RSA_2048_CT: &str = include_str!("../tests/examples/rsa2048-ct-two-blocks.b64");

fn helper() -> RsaHelper {
    RsaHelper::builder()
        .algorithm(SignatureAlgorithm::RsaSha256)
        .private_key(RSA_2048_PRIV)
        .public_key(RSA_2048_PUB)
        .build()
        .unwrap()
}

#[bench]
fn bench_rsa_2048_decode_private_key(b: &mut Bencher) {
    let der = Base64::decode_vec(RSA_2048_PRIV.trim()).unwrap();

    b.iter(|| {
        let fields = decode_private_key(der.as_slice()).unwrap();
        test::black_box(fields);
    });
}

#[bench]
fn bench_rsa_2048_probe_public_key(b: &mut Bencher) {
    let der = Base64::decode_vec(RSA_2048_PUB.trim()).unwrap();

    b.iter(|| {
        let probe = probe_public_key(der.as_slice());
        test::black_box(probe);
    });
}

#[bench]
fn bench_rsa_2048_build_helper(b: &mut Bencher) {
    b.iter(|| test::black_box(helper()));
}

#[bench]
fn bench_rsa_2048_sign(b: &mut Bencher) {
    let helper = helper();

    b.iter(|| {
        let signature = helper.sign("testing").unwrap();
        test::black_box(signature);
    });
}

#[bench]
fn bench_rsa_2048_decrypt_two_blocks(b: &mut Bencher) {
    let helper = helper();

    b.iter(|| {
        let plaintext = helper.decrypt(RSA_2048_CT).unwrap();
        test::black_box(plaintext);
    });
}
