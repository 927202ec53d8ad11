//! Hemodynamic indices derived from blood pressure and heart rate.
//!
//! Every index is a pure function of (a subset of) a [`PatientMeasurement`].
//! Indices that depend on other indices call them directly, so evaluation
//! order follows the dependency chain:
//!
//! - leaf metrics: BMI, BSA, pulse pressure, mean arterial pressure
//! - arterial compliance → characteristic impedance → stroke volume
//! - stroke volume → cardiac output / index, elastances, pulsatile load
//! - impedance → sympathetic activation → SVR, sympathetic and baroreflex indices
//!
//! Nothing here validates inputs or catches numeric faults. A division by
//! zero, negative radicand or non-positive logarithm argument comes back as
//! NaN or infinity. The one deliberate exception is [`baroreflex_activity`],
//! which is defined as zero when its radicand is negative.
//!
//! Units follow the clinical convention used for ABPM reports: pressures in
//! mmHg, volumes in mL, flows in L/min, times in seconds.

use crate::PatientMeasurement;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f64::consts::{E, PI};

/// Weights of the normalized end-systolic elastance term.
///
/// These are applied as `ratio * c` for every coefficient, not as a power
/// series in the PEP/ejection-time ratio.
// TODO: confirm with the cardiology group whether these were meant as
// coefficients of ratio^i.
const ELASTANCE_COEFFICIENTS: [f64; 8] = [
    0.35695, -7.2266, 74.249, -307.39, 684.54, -856.92, 571.95, -159.1,
];

// ============================================================================
// Leaf metrics
// ============================================================================

/// Body mass index in kg/m²
pub fn body_mass_index(weight: f64, height: f64) -> f64 {
    weight / height.powi(2)
}

/// Body surface area in m² (Mosteller)
pub fn body_surface_area(weight: f64, height: f64) -> f64 {
    ((weight * height * 100.0) / 3600.0).sqrt()
}

/// Pulse pressure in mmHg
pub fn pulse_pressure(systolic_blood_pressure: f64, diastolic_blood_pressure: f64) -> f64 {
    systolic_blood_pressure - diastolic_blood_pressure
}

/// Mean arterial pressure in mmHg
pub fn mean_arterial_pressure(systolic_blood_pressure: f64, diastolic_blood_pressure: f64) -> f64 {
    diastolic_blood_pressure
        + pulse_pressure(systolic_blood_pressure, diastolic_blood_pressure) * 0.35
}

// ============================================================================
// Shared intermediates
// ============================================================================

/// Width of the age-adjusted arctangent pressure/area curve.
///
/// Zero at age 57 / 0.44 ≈ 129.5 years.
fn pressure_span(age: f64) -> f64 {
    57.0 - 0.44 * age
}

/// Mean arterial pressure expressed as a deviation from the age-adjusted
/// curve centre, in units of [`pressure_span`].
fn pressure_deviation(age: f64, mean_arterial_pressure: f64) -> f64 {
    (mean_arterial_pressure - (76.0 - 0.89 * age)) / pressure_span(age)
}

/// Ejection time in seconds
fn ejection_time(heart_rate: f64, mean_arterial_pressure: f64) -> f64 {
    ((413.0 - 1.7 * heart_rate) / (mean_arterial_pressure / 95.0).sqrt()) / 1000.0
}

/// Pre-ejection period in seconds
fn pre_ejection_period(heart_rate: f64, mean_arterial_pressure: f64) -> f64 {
    ((131.0 - 0.4 * heart_rate) * (mean_arterial_pressure / 100.0).sqrt()) / 1000.0
}

// ============================================================================
// Arterial mechanics
// ============================================================================

/// Pressure-dependent arterial compliance C(p) in mL/mmHg
pub fn pressure_dependent_arterial_compliance(
    age: f64,
    weight: f64,
    height: f64,
    systolic_blood_pressure: f64,
    diastolic_blood_pressure: f64,
) -> f64 {
    let bmi = body_mass_index(weight, height);
    let map = mean_arterial_pressure(systolic_blood_pressure, diastolic_blood_pressure);
    let deviation = pressure_deviation(age, map);

    let slope = 5.62 / (PI * pressure_span(age)) / (1.0 + deviation.powi(2));
    let compliance = (height * 100.0 / 2.0) * slope;
    compliance * (bmi / 27.5)
}

/// Characteristic impedance Zc in mmHg·s/cm³
pub fn characteristic_impedance(
    age: f64,
    weight: f64,
    height: f64,
    systolic_blood_pressure: f64,
    diastolic_blood_pressure: f64,
) -> f64 {
    let compliance = pressure_dependent_arterial_compliance(
        age,
        weight,
        height,
        systolic_blood_pressure,
        diastolic_blood_pressure,
    );
    let map = mean_arterial_pressure(systolic_blood_pressure, diastolic_blood_pressure);
    let angle = pressure_deviation(age, map).atan();

    let area = 5.62 * (0.5 + (1.0 / PI * angle));
    let stiffness = area * compliance;
    // An infinite impedance would drive stroke volume to a plausible-looking zero.
    if stiffness == 0.0 {
        return f64::NAN;
    }
    (1.06 / stiffness).sqrt()
}

/// Pulse wave velocity in m/s
pub fn pulse_wave_velocity(
    age: f64,
    systolic_blood_pressure: f64,
    diastolic_blood_pressure: f64,
) -> f64 {
    let map = mean_arterial_pressure(systolic_blood_pressure, diastolic_blood_pressure);
    let deviation = pressure_deviation(age, map);

    let spread = 1.0 + deviation.powi(2);
    let angle = (1.0 / PI) * deviation.atan();
    0.357 * ((PI * pressure_span(age)) * spread * (0.5 + angle)).sqrt()
}

/// RC time constant in seconds
pub fn tau_rc(
    systolic_blood_pressure: f64,
    diastolic_blood_pressure: f64,
    heart_rate: f64,
) -> f64 {
    let map = mean_arterial_pressure(systolic_blood_pressure, diastolic_blood_pressure);
    let pp = pulse_pressure(systolic_blood_pressure, diastolic_blood_pressure);
    (map / pp) * (60.0 / heart_rate)
}

/// Windkessel time constant in seconds
pub fn tau_wk(
    systolic_blood_pressure: f64,
    diastolic_blood_pressure: f64,
    heart_rate: f64,
) -> f64 {
    let map = mean_arterial_pressure(systolic_blood_pressure, diastolic_blood_pressure);
    let ejection = ejection_time(heart_rate, map);

    // ln(MAP / 0) is +inf and would quietly turn the result into zero.
    let decay = if diastolic_blood_pressure == 0.0 {
        f64::NAN
    } else {
        (map / diastolic_blood_pressure).ln()
    };
    ((60.0 / heart_rate) - ejection) / decay
}

// ============================================================================
// Flow
// ============================================================================

/// Stroke volume in mL
pub fn stroke_volume(
    age: f64,
    weight: f64,
    height: f64,
    systolic_blood_pressure: f64,
    diastolic_blood_pressure: f64,
    heart_rate: f64,
) -> f64 {
    let impedance = characteristic_impedance(
        age,
        weight,
        height,
        systolic_blood_pressure,
        diastolic_blood_pressure,
    );
    let map = mean_arterial_pressure(systolic_blood_pressure, diastolic_blood_pressure);
    let ejection = ejection_time(heart_rate, map);

    let decayed = map * E.powf((-ejection / (heart_rate / 60.0)) - 0.25);
    let end_diastolic = map - decayed;
    end_diastolic / impedance
}

/// Cardiac output in L/min
pub fn cardiac_output(
    age: f64,
    weight: f64,
    height: f64,
    systolic_blood_pressure: f64,
    diastolic_blood_pressure: f64,
    heart_rate: f64,
) -> f64 {
    let sv = stroke_volume(
        age,
        weight,
        height,
        systolic_blood_pressure,
        diastolic_blood_pressure,
        heart_rate,
    );
    (sv / 1000.0) * heart_rate
}

/// Cardiac index in L/min/m²
pub fn cardiac_index(
    age: f64,
    weight: f64,
    height: f64,
    systolic_blood_pressure: f64,
    diastolic_blood_pressure: f64,
    heart_rate: f64,
) -> f64 {
    let bsa = body_surface_area(weight, height);
    let co = cardiac_output(
        age,
        weight,
        height,
        systolic_blood_pressure,
        diastolic_blood_pressure,
        heart_rate,
    );
    co / bsa
}

/// Cardiac potency (power output estimate), MAP · CO / 450
pub fn cardiac_potency(
    age: f64,
    weight: f64,
    height: f64,
    systolic_blood_pressure: f64,
    diastolic_blood_pressure: f64,
    heart_rate: f64,
) -> f64 {
    let co = cardiac_output(
        age,
        weight,
        height,
        systolic_blood_pressure,
        diastolic_blood_pressure,
        heart_rate,
    );
    let map = mean_arterial_pressure(systolic_blood_pressure, diastolic_blood_pressure);
    (co * map) / 450.0
}

// ============================================================================
// Autonomic indices
// ============================================================================

/// Sympathetic nervous system activation (dimensionless)
///
/// A zero impedance makes the exponent infinite and the result `inf`.
pub fn sympathetic_nervous_system_activation(
    age: f64,
    weight: f64,
    height: f64,
    systolic_blood_pressure: f64,
    diastolic_blood_pressure: f64,
    heart_rate: f64,
) -> f64 {
    let impedance = characteristic_impedance(
        age,
        weight,
        height,
        systolic_blood_pressure,
        diastolic_blood_pressure,
    );
    E.powf(((60.0 / heart_rate) + 0.12) / impedance)
}

/// Systemic vascular resistance in dyn·s/cm⁵
pub fn systemic_vascular_resistance(
    age: f64,
    weight: f64,
    height: f64,
    systolic_blood_pressure: f64,
    diastolic_blood_pressure: f64,
    heart_rate: f64,
) -> f64 {
    let sns = sympathetic_nervous_system_activation(
        age,
        weight,
        height,
        systolic_blood_pressure,
        diastolic_blood_pressure,
        heart_rate,
    );
    let map = mean_arterial_pressure(systolic_blood_pressure, diastolic_blood_pressure);
    let co = cardiac_output(
        age,
        weight,
        height,
        systolic_blood_pressure,
        diastolic_blood_pressure,
        heart_rate,
    );
    ((1.0 - (1.0 / sns)) * (map / co)) * 80.0
}

/// Sympathetic activity index in %
pub fn sympathetic_activity_index(
    age: f64,
    weight: f64,
    height: f64,
    systolic_blood_pressure: f64,
    diastolic_blood_pressure: f64,
    heart_rate: f64,
) -> f64 {
    let sns = sympathetic_nervous_system_activation(
        age,
        weight,
        height,
        systolic_blood_pressure,
        diastolic_blood_pressure,
        heart_rate,
    );
    (1.0 / sns) * 100.0
}

/// Baroreflex heart rate response, a logistic curve over MAP
pub fn baroreflex_heart_rate(systolic_blood_pressure: f64, diastolic_blood_pressure: f64) -> f64 {
    let map = mean_arterial_pressure(systolic_blood_pressure, diastolic_blood_pressure);
    0.66 + ((0.66 - 1.2) / (1.0 + 67_000_000_000_000.0 * E.powf(-31.0 * map / 89.0)))
}

/// Baroreflex activity in U
pub fn baroreflex_activity(
    age: f64,
    weight: f64,
    height: f64,
    systolic_blood_pressure: f64,
    diastolic_blood_pressure: f64,
    heart_rate: f64,
) -> f64 {
    let sns = sympathetic_nervous_system_activation(
        age,
        weight,
        height,
        systolic_blood_pressure,
        diastolic_blood_pressure,
        heart_rate,
    );
    let heart_rate_response =
        baroreflex_heart_rate(systolic_blood_pressure, diastolic_blood_pressure);
    baroreflex_activity_from(sns, heart_rate_response)
}

/// Baroreflex activity is zero, not NaN, when the drive is negative.
fn baroreflex_activity_from(sns_activation: f64, baroreflex_heart_rate: f64) -> f64 {
    let drive = (sns_activation * 0.75) - (baroreflex_heart_rate * 0.25);
    if drive < 0.0 {
        0.0
    } else {
        (drive / 7.7).sqrt()
    }
}

// ============================================================================
// Ventricular-arterial coupling
// ============================================================================

/// Maximum (end-systolic) ventricular elastance in mmHg/mL
///
/// Single-beat estimate from the PEP / ejection-time ratio, the ejection
/// fraction and the diastolic/systolic ratio.
#[allow(clippy::too_many_arguments)]
pub fn maximum_elastance(
    age: f64,
    weight: f64,
    height: f64,
    systolic_blood_pressure: f64,
    diastolic_blood_pressure: f64,
    heart_rate: f64,
    left_ventricular_ejection_fraction: f64,
) -> f64 {
    let sv = stroke_volume(
        age,
        weight,
        height,
        systolic_blood_pressure,
        diastolic_blood_pressure,
        heart_rate,
    );
    let map = mean_arterial_pressure(systolic_blood_pressure, diastolic_blood_pressure);
    let pep = pre_ejection_period(heart_rate, map);
    let ejection = ejection_time(heart_rate, map);
    let ratio = pep / ejection;

    let nd_mean = ELASTANCE_COEFFICIENTS
        .iter()
        .fold(0.0, |acc, c| acc + (ratio * c));

    let nd_estimate = (0.0275 - (0.165 * left_ventricular_ejection_fraction))
        + (0.3656 * (diastolic_blood_pressure / systolic_blood_pressure))
        + (0.515 * nd_mean);
    let single_beat = (diastolic_blood_pressure
        - (nd_estimate * 0.9 * systolic_blood_pressure))
        / (sv * nd_estimate);

    0.78 * single_beat + 0.55
}

/// Effective arterial elastance Ea in mmHg/mL
pub fn arterial_elastance(
    age: f64,
    weight: f64,
    height: f64,
    systolic_blood_pressure: f64,
    diastolic_blood_pressure: f64,
    heart_rate: f64,
) -> f64 {
    let sv = stroke_volume(
        age,
        weight,
        height,
        systolic_blood_pressure,
        diastolic_blood_pressure,
        heart_rate,
    );
    let map = mean_arterial_pressure(systolic_blood_pressure, diastolic_blood_pressure);
    map / sv
}

/// Arterial-ventricular coupling ratio Ea / Emax
#[allow(clippy::too_many_arguments)]
pub fn arterial_ventricular_elastance(
    age: f64,
    weight: f64,
    height: f64,
    systolic_blood_pressure: f64,
    diastolic_blood_pressure: f64,
    heart_rate: f64,
    left_ventricular_ejection_fraction: f64,
) -> f64 {
    let emax = maximum_elastance(
        age,
        weight,
        height,
        systolic_blood_pressure,
        diastolic_blood_pressure,
        heart_rate,
        left_ventricular_ejection_fraction,
    );
    let ea = arterial_elastance(
        age,
        weight,
        height,
        systolic_blood_pressure,
        diastolic_blood_pressure,
        heart_rate,
    );
    ea / emax
}

/// Pulsatile load in mmHg/mL
pub fn pulsatile_load(
    age: f64,
    weight: f64,
    height: f64,
    systolic_blood_pressure: f64,
    diastolic_blood_pressure: f64,
    heart_rate: f64,
) -> f64 {
    let sv = stroke_volume(
        age,
        weight,
        height,
        systolic_blood_pressure,
        diastolic_blood_pressure,
        heart_rate,
    );
    let pp = pulse_pressure(systolic_blood_pressure, diastolic_blood_pressure);
    pp / sv
}

// ============================================================================
// Measurement-level API
// ============================================================================

impl PatientMeasurement {
    pub fn body_mass_index(&self) -> f64 {
        body_mass_index(self.weight, self.height)
    }

    pub fn body_surface_area(&self) -> f64 {
        body_surface_area(self.weight, self.height)
    }

    pub fn pulse_pressure(&self) -> f64 {
        pulse_pressure(self.systolic_blood_pressure, self.diastolic_blood_pressure)
    }

    pub fn mean_arterial_pressure(&self) -> f64 {
        mean_arterial_pressure(self.systolic_blood_pressure, self.diastolic_blood_pressure)
    }

    pub fn arterial_compliance(&self) -> f64 {
        pressure_dependent_arterial_compliance(
            self.age,
            self.weight,
            self.height,
            self.systolic_blood_pressure,
            self.diastolic_blood_pressure,
        )
    }

    pub fn characteristic_impedance(&self) -> f64 {
        characteristic_impedance(
            self.age,
            self.weight,
            self.height,
            self.systolic_blood_pressure,
            self.diastolic_blood_pressure,
        )
    }

    pub fn tau_rc(&self) -> f64 {
        tau_rc(
            self.systolic_blood_pressure,
            self.diastolic_blood_pressure,
            self.heart_rate,
        )
    }

    pub fn tau_wk(&self) -> f64 {
        tau_wk(
            self.systolic_blood_pressure,
            self.diastolic_blood_pressure,
            self.heart_rate,
        )
    }

    pub fn stroke_volume(&self) -> f64 {
        stroke_volume(
            self.age,
            self.weight,
            self.height,
            self.systolic_blood_pressure,
            self.diastolic_blood_pressure,
            self.heart_rate,
        )
    }

    pub fn cardiac_output(&self) -> f64 {
        cardiac_output(
            self.age,
            self.weight,
            self.height,
            self.systolic_blood_pressure,
            self.diastolic_blood_pressure,
            self.heart_rate,
        )
    }

    pub fn cardiac_index(&self) -> f64 {
        cardiac_index(
            self.age,
            self.weight,
            self.height,
            self.systolic_blood_pressure,
            self.diastolic_blood_pressure,
            self.heart_rate,
        )
    }

    pub fn sympathetic_nervous_system_activation(&self) -> f64 {
        sympathetic_nervous_system_activation(
            self.age,
            self.weight,
            self.height,
            self.systolic_blood_pressure,
            self.diastolic_blood_pressure,
            self.heart_rate,
        )
    }

    pub fn systemic_vascular_resistance(&self) -> f64 {
        systemic_vascular_resistance(
            self.age,
            self.weight,
            self.height,
            self.systolic_blood_pressure,
            self.diastolic_blood_pressure,
            self.heart_rate,
        )
    }

    pub fn sympathetic_activity_index(&self) -> f64 {
        sympathetic_activity_index(
            self.age,
            self.weight,
            self.height,
            self.systolic_blood_pressure,
            self.diastolic_blood_pressure,
            self.heart_rate,
        )
    }

    pub fn baroreflex_activity(&self) -> f64 {
        baroreflex_activity(
            self.age,
            self.weight,
            self.height,
            self.systolic_blood_pressure,
            self.diastolic_blood_pressure,
            self.heart_rate,
        )
    }

    pub fn baroreflex_heart_rate(&self) -> f64 {
        baroreflex_heart_rate(self.systolic_blood_pressure, self.diastolic_blood_pressure)
    }

    pub fn maximum_elastance(&self) -> f64 {
        maximum_elastance(
            self.age,
            self.weight,
            self.height,
            self.systolic_blood_pressure,
            self.diastolic_blood_pressure,
            self.heart_rate,
            self.left_ventricular_ejection_fraction,
        )
    }

    pub fn arterial_elastance(&self) -> f64 {
        arterial_elastance(
            self.age,
            self.weight,
            self.height,
            self.systolic_blood_pressure,
            self.diastolic_blood_pressure,
            self.heart_rate,
        )
    }

    pub fn arterial_ventricular_elastance(&self) -> f64 {
        arterial_ventricular_elastance(
            self.age,
            self.weight,
            self.height,
            self.systolic_blood_pressure,
            self.diastolic_blood_pressure,
            self.heart_rate,
            self.left_ventricular_ejection_fraction,
        )
    }

    pub fn pulsatile_load(&self) -> f64 {
        pulsatile_load(
            self.age,
            self.weight,
            self.height,
            self.systolic_blood_pressure,
            self.diastolic_blood_pressure,
            self.heart_rate,
        )
    }

    pub fn cardiac_potency(&self) -> f64 {
        cardiac_potency(
            self.age,
            self.weight,
            self.height,
            self.systolic_blood_pressure,
            self.diastolic_blood_pressure,
            self.heart_rate,
        )
    }

    pub fn pulse_wave_velocity(&self) -> f64 {
        pulse_wave_velocity(
            self.age,
            self.systolic_blood_pressure,
            self.diastolic_blood_pressure,
        )
    }

    /// Evaluate every index for this measurement
    pub fn profile(&self) -> HemodynamicProfile {
        HemodynamicProfile::compute(self)
    }
}

// ============================================================================
// Index catalogue
// ============================================================================

/// Every derived index, in dependency order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HemodynamicIndex {
    BodyMassIndex,
    BodySurfaceArea,
    PulsePressure,
    MeanArterialPressure,
    PressureDependentArterialCompliance,
    CharacteristicImpedance,
    TauRc,
    TauWk,
    StrokeVolume,
    CardiacOutput,
    CardiacIndex,
    SympatheticNervousSystemActivation,
    SystemicVascularResistance,
    SympatheticActivityIndex,
    BaroreflexActivity,
    BaroreflexHeartRate,
    MaximumElastance,
    ArterialElastance,
    ArterialVentricularElastance,
    PulsatileLoad,
    CardiacPotency,
    PulseWaveVelocity,
}

impl HemodynamicIndex {
    pub const ALL: [HemodynamicIndex; 22] = [
        HemodynamicIndex::BodyMassIndex,
        HemodynamicIndex::BodySurfaceArea,
        HemodynamicIndex::PulsePressure,
        HemodynamicIndex::MeanArterialPressure,
        HemodynamicIndex::PressureDependentArterialCompliance,
        HemodynamicIndex::CharacteristicImpedance,
        HemodynamicIndex::TauRc,
        HemodynamicIndex::TauWk,
        HemodynamicIndex::StrokeVolume,
        HemodynamicIndex::CardiacOutput,
        HemodynamicIndex::CardiacIndex,
        HemodynamicIndex::SympatheticNervousSystemActivation,
        HemodynamicIndex::SystemicVascularResistance,
        HemodynamicIndex::SympatheticActivityIndex,
        HemodynamicIndex::BaroreflexActivity,
        HemodynamicIndex::BaroreflexHeartRate,
        HemodynamicIndex::MaximumElastance,
        HemodynamicIndex::ArterialElastance,
        HemodynamicIndex::ArterialVentricularElastance,
        HemodynamicIndex::PulsatileLoad,
        HemodynamicIndex::CardiacPotency,
        HemodynamicIndex::PulseWaveVelocity,
    ];

    /// Column / key name
    pub fn name(&self) -> &'static str {
        match self {
            HemodynamicIndex::BodyMassIndex => "body_mass_index",
            HemodynamicIndex::BodySurfaceArea => "body_surface_area",
            HemodynamicIndex::PulsePressure => "pulse_pressure",
            HemodynamicIndex::MeanArterialPressure => "mean_arterial_pressure",
            HemodynamicIndex::PressureDependentArterialCompliance => {
                "pressure_dependent_arterial_compliance"
            }
            HemodynamicIndex::CharacteristicImpedance => "characteristic_impedance",
            HemodynamicIndex::TauRc => "tau_rc",
            HemodynamicIndex::TauWk => "tau_wk",
            HemodynamicIndex::StrokeVolume => "stroke_volume",
            HemodynamicIndex::CardiacOutput => "cardiac_output",
            HemodynamicIndex::CardiacIndex => "cardiac_index",
            HemodynamicIndex::SympatheticNervousSystemActivation => {
                "sympathetic_nervous_system_activation"
            }
            HemodynamicIndex::SystemicVascularResistance => "systemic_vascular_resistance",
            HemodynamicIndex::SympatheticActivityIndex => "sympathetic_activity_index",
            HemodynamicIndex::BaroreflexActivity => "baroreflex_activity",
            HemodynamicIndex::BaroreflexHeartRate => "baroreflex_heart_rate",
            HemodynamicIndex::MaximumElastance => "maximum_elastance",
            HemodynamicIndex::ArterialElastance => "arterial_elastance",
            HemodynamicIndex::ArterialVentricularElastance => "arterial_ventricular_elastance",
            HemodynamicIndex::PulsatileLoad => "pulsatile_load",
            HemodynamicIndex::CardiacPotency => "cardiac_potency",
            HemodynamicIndex::PulseWaveVelocity => "pulse_wave_velocity",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            HemodynamicIndex::BodyMassIndex => "kg/m²",
            HemodynamicIndex::BodySurfaceArea => "m²",
            HemodynamicIndex::PulsePressure | HemodynamicIndex::MeanArterialPressure => "mmHg",
            HemodynamicIndex::PressureDependentArterialCompliance => "mL/mmHg",
            HemodynamicIndex::CharacteristicImpedance => "mmHg·s/cm³",
            HemodynamicIndex::TauRc | HemodynamicIndex::TauWk => "s",
            HemodynamicIndex::StrokeVolume => "mL",
            HemodynamicIndex::CardiacOutput => "L/min",
            HemodynamicIndex::CardiacIndex => "L/min/m²",
            HemodynamicIndex::SystemicVascularResistance => "dyn·s/cm⁵",
            HemodynamicIndex::SympatheticActivityIndex => "%",
            HemodynamicIndex::BaroreflexActivity => "U",
            HemodynamicIndex::MaximumElastance
            | HemodynamicIndex::ArterialElastance
            | HemodynamicIndex::PulsatileLoad => "mmHg/mL",
            HemodynamicIndex::CardiacPotency => "W",
            HemodynamicIndex::PulseWaveVelocity => "m/s",
            HemodynamicIndex::SympatheticNervousSystemActivation
            | HemodynamicIndex::BaroreflexHeartRate
            | HemodynamicIndex::ArterialVentricularElastance => "dimensionless",
        }
    }

    /// Look an index up by its [`name`](Self::name)
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|index| index.name() == name)
    }

    pub fn evaluate(&self, m: &PatientMeasurement) -> f64 {
        match self {
            HemodynamicIndex::BodyMassIndex => m.body_mass_index(),
            HemodynamicIndex::BodySurfaceArea => m.body_surface_area(),
            HemodynamicIndex::PulsePressure => m.pulse_pressure(),
            HemodynamicIndex::MeanArterialPressure => m.mean_arterial_pressure(),
            HemodynamicIndex::PressureDependentArterialCompliance => m.arterial_compliance(),
            HemodynamicIndex::CharacteristicImpedance => m.characteristic_impedance(),
            HemodynamicIndex::TauRc => m.tau_rc(),
            HemodynamicIndex::TauWk => m.tau_wk(),
            HemodynamicIndex::StrokeVolume => m.stroke_volume(),
            HemodynamicIndex::CardiacOutput => m.cardiac_output(),
            HemodynamicIndex::CardiacIndex => m.cardiac_index(),
            HemodynamicIndex::SympatheticNervousSystemActivation => {
                m.sympathetic_nervous_system_activation()
            }
            HemodynamicIndex::SystemicVascularResistance => m.systemic_vascular_resistance(),
            HemodynamicIndex::SympatheticActivityIndex => m.sympathetic_activity_index(),
            HemodynamicIndex::BaroreflexActivity => m.baroreflex_activity(),
            HemodynamicIndex::BaroreflexHeartRate => m.baroreflex_heart_rate(),
            HemodynamicIndex::MaximumElastance => m.maximum_elastance(),
            HemodynamicIndex::ArterialElastance => m.arterial_elastance(),
            HemodynamicIndex::ArterialVentricularElastance => m.arterial_ventricular_elastance(),
            HemodynamicIndex::PulsatileLoad => m.pulsatile_load(),
            HemodynamicIndex::CardiacPotency => m.cardiac_potency(),
            HemodynamicIndex::PulseWaveVelocity => m.pulse_wave_velocity(),
        }
    }
}

impl std::fmt::Display for HemodynamicIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Profile
// ============================================================================

/// All indices for one measurement
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HemodynamicProfile {
    pub body_mass_index: f64,
    pub body_surface_area: f64,
    pub pulse_pressure: f64,
    pub mean_arterial_pressure: f64,
    pub pressure_dependent_arterial_compliance: f64,
    pub characteristic_impedance: f64,
    pub tau_rc: f64,
    pub tau_wk: f64,
    pub stroke_volume: f64,
    pub cardiac_output: f64,
    pub cardiac_index: f64,
    pub sympathetic_nervous_system_activation: f64,
    pub systemic_vascular_resistance: f64,
    pub sympathetic_activity_index: f64,
    pub baroreflex_activity: f64,
    pub baroreflex_heart_rate: f64,
    pub maximum_elastance: f64,
    pub arterial_elastance: f64,
    pub arterial_ventricular_elastance: f64,
    pub pulsatile_load: f64,
    pub cardiac_potency: f64,
    pub pulse_wave_velocity: f64,
}

impl HemodynamicProfile {
    pub fn compute(m: &PatientMeasurement) -> Self {
        Self {
            body_mass_index: m.body_mass_index(),
            body_surface_area: m.body_surface_area(),
            pulse_pressure: m.pulse_pressure(),
            mean_arterial_pressure: m.mean_arterial_pressure(),
            pressure_dependent_arterial_compliance: m.arterial_compliance(),
            characteristic_impedance: m.characteristic_impedance(),
            tau_rc: m.tau_rc(),
            tau_wk: m.tau_wk(),
            stroke_volume: m.stroke_volume(),
            cardiac_output: m.cardiac_output(),
            cardiac_index: m.cardiac_index(),
            sympathetic_nervous_system_activation: m.sympathetic_nervous_system_activation(),
            systemic_vascular_resistance: m.systemic_vascular_resistance(),
            sympathetic_activity_index: m.sympathetic_activity_index(),
            baroreflex_activity: m.baroreflex_activity(),
            baroreflex_heart_rate: m.baroreflex_heart_rate(),
            maximum_elastance: m.maximum_elastance(),
            arterial_elastance: m.arterial_elastance(),
            arterial_ventricular_elastance: m.arterial_ventricular_elastance(),
            pulsatile_load: m.pulsatile_load(),
            cardiac_potency: m.cardiac_potency(),
            pulse_wave_velocity: m.pulse_wave_velocity(),
        }
    }

    pub fn get(&self, index: HemodynamicIndex) -> f64 {
        match index {
            HemodynamicIndex::BodyMassIndex => self.body_mass_index,
            HemodynamicIndex::BodySurfaceArea => self.body_surface_area,
            HemodynamicIndex::PulsePressure => self.pulse_pressure,
            HemodynamicIndex::MeanArterialPressure => self.mean_arterial_pressure,
            HemodynamicIndex::PressureDependentArterialCompliance => {
                self.pressure_dependent_arterial_compliance
            }
            HemodynamicIndex::CharacteristicImpedance => self.characteristic_impedance,
            HemodynamicIndex::TauRc => self.tau_rc,
            HemodynamicIndex::TauWk => self.tau_wk,
            HemodynamicIndex::StrokeVolume => self.stroke_volume,
            HemodynamicIndex::CardiacOutput => self.cardiac_output,
            HemodynamicIndex::CardiacIndex => self.cardiac_index,
            HemodynamicIndex::SympatheticNervousSystemActivation => {
                self.sympathetic_nervous_system_activation
            }
            HemodynamicIndex::SystemicVascularResistance => self.systemic_vascular_resistance,
            HemodynamicIndex::SympatheticActivityIndex => self.sympathetic_activity_index,
            HemodynamicIndex::BaroreflexActivity => self.baroreflex_activity,
            HemodynamicIndex::BaroreflexHeartRate => self.baroreflex_heart_rate,
            HemodynamicIndex::MaximumElastance => self.maximum_elastance,
            HemodynamicIndex::ArterialElastance => self.arterial_elastance,
            HemodynamicIndex::ArterialVentricularElastance => self.arterial_ventricular_elastance,
            HemodynamicIndex::PulsatileLoad => self.pulsatile_load,
            HemodynamicIndex::CardiacPotency => self.cardiac_potency,
            HemodynamicIndex::PulseWaveVelocity => self.pulse_wave_velocity,
        }
    }

    /// `(index, value)` pairs in dependency order
    pub fn entries(&self) -> impl Iterator<Item = (HemodynamicIndex, f64)> + '_ {
        HemodynamicIndex::ALL
            .into_iter()
            .map(move |index| (index, self.get(index)))
    }

    /// Index name to value, for tabular output
    pub fn to_map(&self) -> BTreeMap<&'static str, f64> {
        self.entries()
            .map(|(index, value)| (index.name(), value))
            .collect()
    }

    /// Indices whose value is NaN or infinite
    pub fn non_finite(&self) -> Vec<HemodynamicIndex> {
        self.entries()
            .filter(|(_, value)| !value.is_finite())
            .map(|(index, _)| index)
            .collect()
    }
}
