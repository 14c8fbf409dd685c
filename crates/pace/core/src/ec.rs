//! NIST P-256 point arithmetic and the fixed-width point encoding used on the wire

use p256::elliptic_curve::group::Group;
use p256::elliptic_curve::ops::Reduce;
use p256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use p256::{AffinePoint, EncodedPoint, FieldBytes, NonZeroScalar, ProjectivePoint, Scalar, U256};
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// Width of a field element (and coordinate) in bytes
pub const FIELD_SIZE: usize = 32;

/// Length of an uncompressed point: `04 || X || Y`
pub const ENCODED_POINT_LEN: usize = 1 + 2 * FIELD_SIZE;

const UNCOMPRESSED_TAG: u8 = 0x04;

/// A point on P-256 other than the point at infinity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurvePoint(AffinePoint);

impl CurvePoint {
    fn from_projective(point: ProjectivePoint) -> Result<Self> {
        if bool::from(point.is_identity()) {
            return Err(Error::protocol("point at infinity"));
        }
        Ok(Self(point.to_affine()))
    }

    /// The x coordinate, left-padded to [`FIELD_SIZE`] bytes
    pub fn x(&self) -> [u8; FIELD_SIZE] {
        let mut x = [0u8; FIELD_SIZE];
        x.copy_from_slice(&self.encode()[1..=FIELD_SIZE]);
        x
    }

    /// The y coordinate, left-padded to [`FIELD_SIZE`] bytes
    pub fn y(&self) -> [u8; FIELD_SIZE] {
        let mut y = [0u8; FIELD_SIZE];
        y.copy_from_slice(&self.encode()[1 + FIELD_SIZE..]);
        y
    }

    /// Uncompressed encoding, see [`encode_point`]
    pub fn encode(&self) -> [u8; ENCODED_POINT_LEN] {
        encode_point(self)
    }
}

/// k·G
pub fn scalar_base_multiply(k: &Scalar) -> Result<CurvePoint> {
    CurvePoint::from_projective(ProjectivePoint::GENERATOR * k)
}

/// k·P
pub fn scalar_multiply(point: &CurvePoint, k: &Scalar) -> Result<CurvePoint> {
    CurvePoint::from_projective(ProjectivePoint::from(point.0) * k)
}

/// P + Q
pub fn add_points(p: &CurvePoint, q: &CurvePoint) -> Result<CurvePoint> {
    CurvePoint::from_projective(ProjectivePoint::from(p.0) + q.0)
}

/// Encode as `04 || X || Y` with both coordinates at full field width
pub fn encode_point(point: &CurvePoint) -> [u8; ENCODED_POINT_LEN] {
    let encoded = point.0.to_encoded_point(false);
    let mut out = [0u8; ENCODED_POINT_LEN];
    out.copy_from_slice(encoded.as_bytes());
    out
}

/// Decode an uncompressed point, rejecting anything not on the curve
pub fn decode_point(bytes: &[u8]) -> Result<CurvePoint> {
    if bytes.len() != ENCODED_POINT_LEN {
        return Err(Error::MalformedPoint("unexpected length"));
    }
    if bytes[0] != UNCOMPRESSED_TAG {
        return Err(Error::MalformedPoint("not an uncompressed point"));
    }

    let encoded =
        EncodedPoint::from_bytes(bytes).map_err(|_| Error::MalformedPoint("invalid encoding"))?;
    Option::<AffinePoint>::from(AffinePoint::from_encoded_point(&encoded))
        .map(CurvePoint)
        .ok_or(Error::MalformedPoint("point is not on the curve"))
}

/// Interpret big-endian bytes of at most [`FIELD_SIZE`] as a scalar, reduced mod n
pub fn scalar_from_bytes(bytes: &[u8]) -> Result<Scalar> {
    if bytes.len() > FIELD_SIZE {
        return Err(Error::protocol(format!(
            "scalar of {} bytes exceeds the field size",
            bytes.len()
        )));
    }
    let mut repr = Zeroizing::new([0u8; FIELD_SIZE]);
    repr[FIELD_SIZE - bytes.len()..].copy_from_slice(bytes);
    Ok(<Scalar as Reduce<U256>>::reduce_bytes(&FieldBytes::from(*repr)))
}

/// Fresh random non-zero scalar for an ephemeral key
pub fn random_scalar() -> NonZeroScalar {
    let mut rng = rand::rng();
    loop {
        let mut repr = Zeroizing::new([0u8; FIELD_SIZE]);
        rng.fill_bytes(&mut repr[..]);
        let candidate = NonZeroScalar::from_repr(FieldBytes::from(*repr));
        if let Some(k) = Option::<NonZeroScalar>::from(candidate) {
            return k;
        }
    }
}
