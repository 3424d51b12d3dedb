//! # LinguisticVariable — Eixos Linguísticos de Entrada e Saída
//!
//! Uma [`LinguisticVariable`] é um eixo numérico limitado (o **universo**)
//! particionado em termos linguísticos ([`FuzzySet`]s) que se sobrepõem
//! nas transições.
//!
//! ## Exemplo: preço da energia (€/MWh)
//!
//! ```text
//!  very_low   low     medium     high    very_high
//!  ┌──╲      ╱╲       ╱╲         ╱╲       ╱──────┐
//!  │   ╲    ╱  ╲     ╱  ╲       ╱  ╲     ╱       │
//!  0   20  40  70  50 80 110   90 120 150 160    200
//! ```
//!
//! ## Fuzzificação
//!
//! [`all_memberships()`](LinguisticVariable::all_memberships) avalia todos os
//! termos de uma vez para um valor crisp. É uma operação pura, determinística
//! e O(termos). Valores fora do universo são **limitados** ao limite mais
//! próximo, nunca rejeitados.
//!
//! ## Discretização
//!
//! O universo é amostrado numa grade de passo fixo (padrão = 1 unidade).
//! A grade alimenta o centroide da defuzzificação e as curvas de
//! visualização, e seu tamanho é limitado a [`MAX_GRID_POINTS`].

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use super::error::{FuzzyError, FuzzyResult};
use super::fuzzy_set::{FuzzySet, Shape};

/// Limite de pontos da grade de um universo.
///
/// Mantém a defuzzificação O(grade) e previsível.
pub const MAX_GRID_POINTS: usize = 10_001;

/// Papel da variável no sistema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableRole {
    /// Entrada (aparece em antecedentes).
    Antecedent,
    /// Saída (aparece em consequentes).
    Consequent,
}

impl std::fmt::Display for VariableRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VariableRole::Antecedent => write!(f, "antecedent"),
            VariableRole::Consequent => write!(f, "consequent"),
        }
    }
}

fn default_step() -> f64 {
    1.0
}

/// Intervalo real limitado `[min, max]` com passo de discretização.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Universe {
    pub min: f64,
    pub max: f64,
    #[serde(default = "default_step")]
    pub step: f64,
}

impl Universe {
    /// Universo com passo unitário.
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max, step: 1.0 }
    }

    /// Limita `x` a `[min, max]`.
    pub fn clamp(&self, x: f64) -> f64 {
        x.clamp(self.min, self.max)
    }

    /// Ponto médio: score neutro usado quando nenhuma regra dispara.
    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    /// Número de pontos da grade (inclui ambos os extremos).
    ///
    /// Satura em `usize::MAX` para passos minúsculos; `validate` rejeita
    /// esses universos antes de qualquer grade ser construída.
    pub fn grid_len(&self) -> usize {
        ((self.width() / self.step).floor() as usize).saturating_add(1)
    }

    /// Pontos da grade `min, min + step, ..., ≤ max`.
    ///
    /// Calculados por multiplicação (não por soma acumulada) para que
    /// chamadas repetidas produzam exatamente os mesmos valores.
    pub fn grid(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.grid_len()).map(move |i| self.min + i as f64 * self.step)
    }

    fn validate(&self, variable: &str) -> FuzzyResult<()> {
        let ok = self.min.is_finite()
            && self.max.is_finite()
            && self.step.is_finite()
            && self.step > 0.0
            && self.min < self.max;
        if !ok {
            return Err(FuzzyError::InvalidUniverse {
                variable: variable.to_string(),
                min: self.min,
                max: self.max,
                step: self.step,
            });
        }
        // comparado em f64: o cast para usize satura
        let steps = (self.width() / self.step).floor();
        if steps >= MAX_GRID_POINTS as f64 {
            return Err(FuzzyError::GridTooLarge {
                variable: variable.to_string(),
                points: self.grid_len(),
                limit: MAX_GRID_POINTS,
            });
        }
        let points = self.grid_len();
        if points > MAX_GRID_POINTS {
            return Err(FuzzyError::GridTooLarge {
                variable: variable.to_string(),
                points,
                limit: MAX_GRID_POINTS,
            });
        }
        Ok(())
    }
}

/// Variável linguística: nome, universo, papel e termos.
///
/// Construída uma vez na inicialização e imutável a partir daí.
/// A ordem de inserção dos termos é a ordem de avaliação e também a
/// ordem das faixas de banding das saídas (crescente em severidade).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinguisticVariable {
    pub name: String,
    pub universe: Universe,
    pub role: VariableRole,
    pub terms: Vec<FuzzySet>,
}

impl LinguisticVariable {
    /// Cria uma variável de entrada sem termos.
    pub fn antecedent(name: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            name: name.into(),
            universe: Universe::new(min, max),
            role: VariableRole::Antecedent,
            terms: Vec::new(),
        }
    }

    /// Cria uma variável de saída sem termos.
    pub fn consequent(name: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            role: VariableRole::Consequent,
            ..Self::antecedent(name, min, max)
        }
    }

    /// Adiciona um termo triangular `(a, b, c)`.
    pub fn tri(mut self, term: &str, a: f64, b: f64, c: f64) -> Self {
        self.terms
            .push(FuzzySet::new(term, Shape::Triangular(a, b, c)));
        self
    }

    /// Adiciona um termo trapezoidal `(a, b, c, d)`.
    pub fn trap(mut self, term: &str, a: f64, b: f64, c: f64, d: f64) -> Self {
        self.terms
            .push(FuzzySet::new(term, Shape::Trapezoidal(a, b, c, d)));
        self
    }

    /// Valida universo, formas e unicidade dos termos.
    pub fn validate(&self) -> FuzzyResult<()> {
        self.universe.validate(&self.name)?;
        if self.terms.is_empty() {
            return Err(FuzzyError::EmptyVariable(self.name.clone()));
        }
        for (i, set) in self.terms.iter().enumerate() {
            set.shape.validate(&self.name, &set.name)?;
            if self.terms[..i].iter().any(|t| t.name == set.name) {
                return Err(FuzzyError::DuplicateTerm {
                    variable: self.name.clone(),
                    term: set.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Índice do termo na ordem declarada.
    pub fn term_index(&self, term: &str) -> Option<usize> {
        self.terms.iter().position(|t| t.name == term)
    }

    pub fn term_names(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(|t| t.name.as_str())
    }

    /// Grau de pertinência de `x` (limitado ao universo) no termo `term`.
    ///
    /// Retorna `None` se o termo não existir.
    pub fn membership(&self, term: &str, x: f64) -> Option<f64> {
        let x = self.universe.clamp(x);
        self.terms
            .iter()
            .find(|t| t.name == term)
            .map(|t| t.membership(x))
    }

    /// Graus de pertinência em todos os termos, na ordem declarada.
    ///
    /// Este é o passo de fuzzificação usado pelo motor.
    pub fn degrees(&self, x: f64) -> Vec<f64> {
        let x = self.universe.clamp(x);
        self.terms.iter().map(|t| t.membership(x)).collect()
    }

    /// Fuzzificação completa: `termo → grau`.
    pub fn all_memberships(&self, x: f64) -> MembershipMap {
        MembershipMap(
            self.term_names()
                .map(String::from)
                .zip(self.degrees(x))
                .collect(),
        )
    }

    /// Curva `(x, μ)` de um termo amostrada na grade do universo.
    ///
    /// Usada pela camada de visualização.
    pub fn membership_curve(&self, term: &str) -> Option<Vec<(f64, f64)>> {
        let set = self.terms.iter().find(|t| t.name == term)?;
        Some(
            self.universe
                .grid()
                .map(|x| (x, set.membership(x)))
                .collect(),
        )
    }

    /// Pontos da grade onde **nenhum** termo tem pertinência positiva.
    ///
    /// O invariante de cobertura exige que esta lista seja vazia.
    pub fn coverage_gaps(&self) -> Vec<f64> {
        self.universe
            .grid()
            .filter(|&x| self.terms.iter().all(|t| t.membership(x) <= 0.0))
            .collect()
    }
}

/// Mapa ordenado `termo → grau` resultante da fuzzificação.
///
/// Preserva a ordem declarada dos termos (serializa como objeto JSON
/// nessa mesma ordem).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MembershipMap(pub Vec<(String, f64)>);

impl MembershipMap {
    /// Grau do termo, ou `None` se o termo não existir.
    pub fn get(&self, term: &str) -> Option<f64> {
        self.0
            .iter()
            .find(|(name, _)| name == term)
            .map(|(_, degree)| *degree)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(name, degree)| (name.as_str(), *degree))
    }
}

impl Serialize for MembershipMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (term, degree) in &self.0 {
            map.serialize_entry(term, degree)?;
        }
        map.end()
    }
}
