//! # FuzzySet — Conjuntos Fuzzy Lineares por Partes
//!
//! Um [`FuzzySet`] é um **termo linguístico** (ex: `"very_high"`) descrito
//! por uma função de pertinência sobre o universo da sua variável.
//!
//! ## Formas Suportadas
//!
//! ```text
//!  Triangular(a, b, c)           Trapezoidal(a, b, c, d)
//!
//!  1 ┤      ╱╲                   1 ┤      ┌──────┐
//!    │     ╱  ╲                    │     ╱        ╲
//!  0 ┼────╱────╲────             0 ┼────╱──────────╲────
//!         a  b  c                       a  b      c  d
//! ```
//!
//! Ambas são lineares por partes: 0 fora de `[a, último]`, rampas lineares
//! entre os pontos de controle e 1 no topo (um único pico no triangular).
//! Ombros degenerados (`a == b` ou `c == d`) são permitidos e produzem
//! pertinência 1 na borda do universo, como nos termos extremos.

use serde::{Deserialize, Serialize};

use super::error::{FuzzyError, FuzzyResult};

/// Forma da função de pertinência.
///
/// Serializada como `{"kind": "triangular", "points": [a, b, c]}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "points", rename_all = "snake_case")]
pub enum Shape {
    /// Triângulo com pico em `b` (`a ≤ b ≤ c`).
    Triangular(f64, f64, f64),
    /// Trapézio com topo plano em `[b, c]` (`a ≤ b ≤ c ≤ d`).
    Trapezoidal(f64, f64, f64, f64),
}

impl Shape {
    /// Grau de pertinência de `x`, sempre em `[0, 1]`.
    ///
    /// O triangular é tratado como um trapézio de topo pontual `[b, b]`.
    pub fn membership(&self, x: f64) -> f64 {
        match *self {
            Shape::Triangular(a, b, c) => ramp(x, a, b, b, c),
            Shape::Trapezoidal(a, b, c, d) => ramp(x, a, b, c, d),
        }
    }

    /// Pontos de controle na ordem declarada.
    pub fn points(&self) -> Vec<f64> {
        match *self {
            Shape::Triangular(a, b, c) => vec![a, b, c],
            Shape::Trapezoidal(a, b, c, d) => vec![a, b, c, d],
        }
    }

    /// Verifica que os pontos são finitos e estão em ordem não-decrescente.
    pub fn validate(&self, variable: &str, term: &str) -> FuzzyResult<()> {
        let points = self.points();
        let invalid = |reason: &str| FuzzyError::InvalidShape {
            variable: variable.to_string(),
            term: term.to_string(),
            reason: reason.to_string(),
        };

        if points.iter().any(|p| !p.is_finite()) {
            return Err(invalid("pontos não finitos"));
        }
        if points.windows(2).any(|w| w[0] > w[1]) {
            return Err(invalid("pontos fora de ordem"));
        }
        Ok(())
    }
}

/// Interpolação linear de um trapézio `(a, b, c, d)`.
///
/// O topo `[b, c]` é testado primeiro para que ombros degenerados
/// (`a == b` ou `c == d`) valham 1 na borda em vez de dividir por zero.
fn ramp(x: f64, a: f64, b: f64, c: f64, d: f64) -> f64 {
    if x >= b && x <= c {
        1.0
    } else if x > a && x < b {
        (x - a) / (b - a)
    } else if x > c && x < d {
        (d - x) / (d - c)
    } else {
        0.0
    }
}

/// Termo linguístico nomeado de uma [`LinguisticVariable`](super::LinguisticVariable).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuzzySet {
    /// Nome único dentro da variável (ex: `"very_high"`).
    pub name: String,
    /// Função de pertinência.
    pub shape: Shape,
}

impl FuzzySet {
    pub fn new(name: impl Into<String>, shape: Shape) -> Self {
        Self {
            name: name.into(),
            shape,
        }
    }

    pub fn membership(&self, x: f64) -> f64 {
        self.shape.membership(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    // ─── Pontos de controle ────────────────────────────────────

    #[test]
    fn triangular_control_points() {
        let s = Shape::Triangular(20.0, 45.0, 70.0);
        assert!(approx(s.membership(20.0), 0.0));
        assert!(approx(s.membership(45.0), 1.0));
        assert!(approx(s.membership(70.0), 0.0));
    }

    #[test]
    fn trapezoidal_control_points() {
        let s = Shape::Trapezoidal(130.0, 160.0, 180.0, 200.0);
        assert!(approx(s.membership(130.0), 0.0));
        assert!(approx(s.membership(160.0), 1.0));
        assert!(approx(s.membership(180.0), 1.0));
        assert!(approx(s.membership(200.0), 0.0));
    }

    #[test]
    fn triangular_ramps_are_linear() {
        let s = Shape::Triangular(50.0, 80.0, 110.0);
        assert!(approx(s.membership(65.0), 0.5));
        assert!(approx(s.membership(95.0), 0.5));
        assert!(approx(s.membership(56.0), 0.2));
    }

    #[test]
    fn outside_support_is_zero() {
        let s = Shape::Triangular(5.0, 7.0, 9.0);
        assert_eq!(s.membership(4.9), 0.0);
        assert_eq!(s.membership(9.1), 0.0);
        assert_eq!(s.membership(-1000.0), 0.0);
    }

    #[test]
    fn degenerate_shoulders_reach_one_at_edges() {
        let left = Shape::Trapezoidal(0.0, 0.0, 20.0, 40.0);
        assert!(approx(left.membership(0.0), 1.0));
        assert!(approx(left.membership(30.0), 0.5));

        let right = Shape::Trapezoidal(130.0, 160.0, 200.0, 200.0);
        assert!(approx(right.membership(200.0), 1.0));
    }

    #[test]
    fn membership_is_continuous_on_dense_grid() {
        // (forma, início do universo, fim do universo)
        let cases = [
            (Shape::Triangular(-25.0, -12.0, 0.0), -50.0, 50.0),
            (Shape::Trapezoidal(15.0, 30.0, 50.0, 50.0), -50.0, 50.0),
            (Shape::Triangular(17.0, 20.0, 23.0), 0.0, 23.0),
        ];
        for (s, lo, hi) in cases {
            let steps = ((hi - lo) / 0.01) as usize;
            let mut prev = s.membership(lo);
            for i in 0..=steps {
                let x = (lo + i as f64 * 0.01).min(hi);
                let m = s.membership(x);
                assert!((0.0..=1.0).contains(&m));
                // nenhuma rampa aqui passa de inclinação 1/3 por unidade
                assert!((m - prev).abs() <= 0.01 / 3.0 + 1e-9, "salto em x={}", x);
                prev = m;
            }
        }
    }

    // ─── Validação ─────────────────────────────────────────────

    #[test]
    fn validate_rejects_unordered_points() {
        let err = Shape::Triangular(10.0, 5.0, 20.0)
            .validate("price", "low")
            .unwrap_err();
        assert!(matches!(err, FuzzyError::InvalidShape { .. }));
    }

    #[test]
    fn validate_rejects_nan() {
        assert!(Shape::Trapezoidal(0.0, f64::NAN, 1.0, 2.0)
            .validate("x", "t")
            .is_err());
    }

    #[test]
    fn shape_serde_format() {
        let json = serde_json::to_string(&Shape::Triangular(1.0, 2.0, 3.0)).unwrap();
        assert_eq!(json, r#"{"kind":"triangular","points":[1.0,2.0,3.0]}"#);
        let back: Shape =
            serde_json::from_str(r#"{"kind":"trapezoidal","points":[0,0,4,6]}"#).unwrap();
        assert_eq!(back, Shape::Trapezoidal(0.0, 0.0, 4.0, 6.0));
    }
}
