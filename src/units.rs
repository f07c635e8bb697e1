use std::{cmp::Ordering, num::FpCategory};

use serde_derive::{Deserialize, Serialize};

macro_rules! impl_partialeq {
    ($t:ty) => {
        impl PartialEq for $t {
            // custom compare function because of floating point inaccuracy
            fn eq(&self, other: &$t) -> bool {
                if (self.0.classify() == FpCategory::Zero
                    || self.0.classify() == FpCategory::Normal)
                    && (other.0.classify() == FpCategory::Zero
                        || other.0.classify() == FpCategory::Normal)
                {
                    // three decimal places have to match
                    (self.0 * 1000.0).round() == (other.0 * 1000.0).round()
                } else {
                    false
                }
            }
        }
    };
}

macro_rules! impl_ord {
    ($t:ty) => {
        impl Ord for $t {
            // custom compare function to offer ordering
            fn cmp(&self, other: &$t) -> Ordering {
                if self.0 < other.0 {
                    Ordering::Less
                } else if self.0 > other.0 {
                    Ordering::Greater
                } else {
                    Ordering::Equal
                }
            }
        }
    };
}

/// Length in PDF user space units (1/72 inch)
#[derive(Debug, Default, Copy, Clone, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pt(pub f32);

impl Pt {
    /// Distance in canvas pixels for a bitmap rendered with `px_per_pt` pixels per point.
    pub fn into_px(self, px_per_pt: f32) -> Px {
        Px(self.0 * px_per_pt)
    }
}

impl From<Pt> for ::lopdf::Object {
    fn from(value: Pt) -> Self {
        Self::Real(value.0)
    }
}

impl Eq for Pt {}

impl_partialeq!(Pt);
impl_ord!(Pt);

/// Length in pixels of a canvas backing bitmap.
///
/// Fractional on purpose: pointer events are reported with sub-pixel precision
/// and a rectangle that is still being dragged can have a negative extent.
#[derive(Debug, Default, Copy, Clone, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Px(pub f32);

impl Px {
    /// Distance in PDF units for a bitmap rendered with `px_per_pt` pixels per point.
    pub fn into_pt(self, px_per_pt: f32) -> Pt {
        Pt(self.0 / px_per_pt)
    }

    pub fn abs(self) -> Self {
        Px(self.0.abs())
    }

    pub fn min(self, other: Self) -> Self {
        Px(self.0.min(other.0))
    }

    pub fn max(self, other: Self) -> Self {
        Px(self.0.max(other.0))
    }
}

impl Eq for Px {}

impl_partialeq!(Px);
impl_ord!(Px);

use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

macro_rules! impl_add_self {
    ($type:ident) => {
        impl Add for $type {
            type Output = Self;
            fn add(self, other: Self) -> Self {
                Self(self.0 + other.0)
            }
        }
    };
}

macro_rules! impl_add_assign_self {
    ($type:ident) => {
        impl AddAssign for $type {
            fn add_assign(&mut self, other: Self) {
                self.0 += other.0;
            }
        }
    };
}

macro_rules! impl_sub_self {
    ($type:ident) => {
        impl Sub for $type {
            type Output = Self;
            fn sub(self, other: Self) -> Self {
                Self(self.0 - other.0)
            }
        }
    };
}

macro_rules! impl_sub_assign_self {
    ($type:ident) => {
        impl SubAssign for $type {
            fn sub_assign(&mut self, other: Self) {
                self.0 -= other.0;
            }
        }
    };
}

macro_rules! impl_neg {
    ($type:ident) => {
        impl Neg for $type {
            type Output = Self;
            fn neg(self) -> Self {
                Self(-self.0)
            }
        }
    };
}

macro_rules! impl_mul_f32 {
    ($type:ident) => {
        impl Mul<f32> for $type {
            type Output = Self;
            fn mul(self, other: f32) -> Self {
                Self(self.0 * other)
            }
        }
    };
}

macro_rules! impl_div {
    ($type:ident) => {
        impl Div<$type> for $type {
            type Output = f32;
            fn div(self, other: $type) -> Self::Output {
                self.0 / other.0
            }
        }
        impl Div<f32> for $type {
            type Output = Self;
            fn div(self, other: f32) -> Self::Output {
                Self(self.0 / other)
            }
        }
    };
}

impl_add_self!(Pt);
impl_add_self!(Px);

impl_add_assign_self!(Pt);
impl_add_assign_self!(Px);

impl_sub_self!(Pt);
impl_sub_self!(Px);

impl_sub_assign_self!(Pt);
impl_sub_assign_self!(Px);

impl_neg!(Pt);
impl_neg!(Px);

impl_mul_f32!(Pt);
impl_mul_f32!(Px);

impl_div!(Pt);
impl_div!(Px);

#[test]
fn pt_to_px_conversion() {
    assert_eq!(Pt(612.0).into_px(1.5), Px(918.0));
    assert_eq!(Px(918.0).into_pt(1.5), Pt(612.0));
}

#[test]
fn px_eq_tolerates_rounding() {
    assert_eq!(Px(66.666_67), Px(200.0) / 3.0);
    assert_ne!(Px(66.6), Px(66.7));
}

#[test]
fn px_eq_zero_check() {
    let px1 = Px(0.0);
    let px2 = Px(-0.0);
    assert_eq!(px1, px2);
}

#[test]
fn nan_is_never_equal() {
    assert_ne!(Pt(f32::NAN), Pt(f32::NAN));
}

#[test]
fn max_pt() {
    let pt_vector = [Pt(0.0), Pt(1.0), Pt(2.0)];
    assert_eq!(pt_vector.iter().max(), Some(&Pt(2.0)));
}

#[test]
fn min_px() {
    let px_vector = [Px(-4.0), Px(1.0), Px(2.0)];
    assert_eq!(px_vector.iter().min(), Some(&Px(-4.0)));
}

#[test]
fn px_abs_min_max() {
    assert_eq!(Px(-3.5).abs(), Px(3.5));
    assert_eq!(Px(2.0).min(Px(-1.0)), Px(-1.0));
    assert_eq!(Px(2.0).max(Px(-1.0)), Px(2.0));
}
