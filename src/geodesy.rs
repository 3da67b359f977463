//! Geodesic distance on the WGS84 ellipsoid.
//!
//! A few resources:
//!
//! - <http://www.movable-type.co.uk/scripts/latlong-vincenty.html>
//! - <https://en.wikipedia.org/wiki/Vincenty%27s_formulae>

use geo_types::Point;
use thiserror::Error;

use crate::{EARTH_FLATTENING, EQUATORIAL_EARTH_RADIUS, POLAR_EARTH_RADIUS};

/// Vincenty's iteration did not converge within 100 rounds.
///
/// This happens for near-antipodal point pairs, which have no meaning for a
/// contiguous GPS track; the generator treats it as invalid input.
#[derive(Error, Debug, Eq, PartialEq)]
#[error("Vincenty algorithm failed to converge")]
pub struct FailedToConvergeError;

/// Determine the distance between two points using [Vincenty's formulae].
///
/// [Vincenty's formulae]: https://en.wikipedia.org/wiki/Vincenty%27s_formulae
pub trait VincentyDistance<Rhs = Self> {
    /// Surface distance in meters between `self` and `rhs` on WGS84.
    ///
    /// # Examples
    ///
    /// ```
    /// use geo_types::Point;
    /// use tracksolid::geodesy::VincentyDistance;
    ///
    /// // New York City to London
    /// let p1 = Point::new(-74.006, 40.7128);
    /// let p2 = Point::new(-0.1278, 51.5074);
    ///
    /// assert_eq!(5_585_234., p1.vincenty_distance(&p2).unwrap().round());
    /// ```
    fn vincenty_distance(&self, rhs: &Rhs) -> Result<f64, FailedToConvergeError>;
}

impl VincentyDistance for Point<f64> {
    fn vincenty_distance(&self, rhs: &Point<f64>) -> Result<f64, FailedToConvergeError> {
        let a = EQUATORIAL_EARTH_RADIUS;
        let b = POLAR_EARTH_RADIUS;
        let f = EARTH_FLATTENING;

        // Difference in longitude, and the reduced latitudes on the
        // auxiliary sphere.
        let l = (rhs.x() - self.x()).to_radians();
        let u1 = ((1.0 - f) * self.y().to_radians().tan()).atan();
        let u2 = ((1.0 - f) * rhs.y().to_radians().tan()).atan();
        let (sin_u1, cos_u1) = u1.sin_cos();
        let (sin_u2, cos_u2) = u2.sin_cos();

        let mut cos_sq_alpha;
        let mut sin_sigma;
        let mut cos_sigma;
        let mut cos2_sigma_m;
        let mut sigma;
        // Longitude of the points on the auxiliary sphere.
        let mut lambda = l;
        let mut iter_limit = 100;

        loop {
            let (sin_lambda, cos_lambda) = lambda.sin_cos();
            sin_sigma = ((cos_u2 * sin_lambda) * (cos_u2 * sin_lambda)
                + (cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda)
                    * (cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda))
                .sqrt();

            if sin_sigma == 0.0 {
                if self == rhs {
                    // coincident points
                    return Ok(0.0);
                }
                // antipodal points, for which the iteration cannot converge
                return Err(FailedToConvergeError);
            }

            cos_sigma = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_lambda;
            sigma = sin_sigma.atan2(cos_sigma);
            let sin_alpha = cos_u1 * cos_u2 * sin_lambda / sin_sigma;
            cos_sq_alpha = 1.0 - sin_alpha * sin_alpha;

            if cos_sq_alpha == 0.0 {
                // equatorial geodesic: sigma_m is undefined and drops out
                cos2_sigma_m = 0.0;
            } else {
                cos2_sigma_m = cos_sigma - 2.0 * sin_u1 * sin_u2 / cos_sq_alpha;
            }

            let c = f / 16.0 * cos_sq_alpha * (4.0 + f * (4.0 - 3.0 * cos_sq_alpha));
            let lambda_p = lambda;
            lambda = l
                + (1.0 - c)
                    * f
                    * sin_alpha
                    * (sigma
                        + c * sin_sigma
                            * (cos2_sigma_m
                                + c * cos_sigma * (-1.0 + 2.0 * cos2_sigma_m * cos2_sigma_m)));

            if (lambda - lambda_p).abs() <= 1e-12 {
                break;
            }

            iter_limit -= 1;
            if iter_limit == 0 {
                return Err(FailedToConvergeError);
            }
        }

        let u_sq = cos_sq_alpha * (a * a - b * b) / (b * b);
        let big_a =
            1.0 + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
        let big_b = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));

        let delta_sigma = big_b
            * sin_sigma
            * (cos2_sigma_m
                + big_b / 4.0
                    * (cos_sigma * (-1.0 + 2.0 * cos2_sigma_m * cos2_sigma_m)
                        - big_b / 6.0
                            * cos2_sigma_m
                            * (-3.0 + 4.0 * sin_sigma * sin_sigma)
                            * (-3.0 + 4.0 * cos2_sigma_m * cos2_sigma_m)));

        Ok(b * big_a * (sigma - delta_sigma))
    }
}
