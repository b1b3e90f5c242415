//! Conversão de leituras para o índice de temperatura do protocolo.
//!
//! O termostato representa temperaturas como um byte (0–253): passos de
//! 0,5°C de −40,0°C a 86,5°C. O índice é sempre derivado do lado Celsius,
//! em aritmética inteira de meios-graus:
//!
//! ```text
//! índice = (°C arredondado a 0,5 + 40) × 2
//! ```
//!
//! Leituras em Fahrenheit são arredondadas ao grau inteiro antes da
//! conversão, então duas leituras que caem no mesmo grau inteiro produzem
//! sempre o mesmo índice.

use crate::types::TemperatureScale;

/// Menor temperatura representável, em meios-graus Celsius (−40,0°C).
const MIN_HALF_DEGREES: i64 = -80;

/// Maior temperatura representável, em meios-graus Celsius (86,5°C).
const MAX_HALF_DEGREES: i64 = 173;

/// Maior índice válido.
pub const MAX_INDEX: u8 = (MAX_HALF_DEGREES - MIN_HALF_DEGREES) as u8;

/// Leitura fora da faixa que o protocolo consegue representar.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error(
    "Temperature {reading}°{scale} (={celsius:.1}°C) is outside the valid range of -40.0°C to 86.5°C"
)]
pub struct RangeError {
    pub reading: f64,
    pub scale: TemperatureScale,
    /// Valor já arredondado a 0,5°C
    pub celsius: f64,
}

/// Converte uma leitura na escala indicada para o índice 0–253.
pub fn temperature_index(reading: f64, scale: TemperatureScale) -> Result<u8, RangeError> {
    let out_of_range = |celsius: f64| RangeError {
        reading,
        scale,
        celsius,
    };

    if !reading.is_finite() {
        return Err(out_of_range(reading));
    }

    let half_degrees = match scale {
        TemperatureScale::C => round_half_away(normalize(reading) * 2.0),
        TemperatureScale::F => {
            let whole_fahrenheit = round_half_away(normalize(reading));
            // (F − 32) × 5/9 × 2, sem passar por ponto flutuante
            rounded_div(whole_fahrenheit.saturating_sub(32).saturating_mul(10), 9)
        }
    };

    if !(MIN_HALF_DEGREES..=MAX_HALF_DEGREES).contains(&half_degrees) {
        return Err(out_of_range(half_degrees as f64 / 2.0));
    }

    Ok((half_degrees - MIN_HALF_DEGREES) as u8)
}

/// Temperatura Celsius representada por um índice.
pub fn celsius_for_index(index: u8) -> Option<f64> {
    (index <= MAX_INDEX).then(|| (i64::from(index) + MIN_HALF_DEGREES) as f64 / 2.0)
}

/// Reduz a leitura a 15 dígitos significativos, descartando o ruído binário
/// (ex: 20.249999999999996 volta a ser 20.25) antes do arredondamento.
fn normalize(value: f64) -> f64 {
    format!("{value:.14e}").parse().unwrap_or(value)
}

/// Arredonda para o inteiro mais próximo; empates se afastam do zero.
fn round_half_away(value: f64) -> i64 {
    // `f64::round` já arredonda empates para longe do zero; a conversão satura.
    value.round() as i64
}

/// Divisão inteira arredondada ao mais próximo, empates longe do zero.
fn rounded_div(numerator: i64, denominator: i64) -> i64 {
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;
    if remainder.abs() * 2 >= denominator.abs() {
        quotient + numerator.signum() * denominator.signum()
    } else {
        quotient
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
