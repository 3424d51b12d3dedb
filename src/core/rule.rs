//! # Regras Fuzzy — IF antecedente THEN consequente
//!
//! Uma [`Rule`] liga uma **condição** sobre as entradas a um termo de
//! **uma** variável de saída:
//!
//! ```text
//! IF price is VERY_HIGH AND consumption is VERY_HIGH
//! THEN market_condition is VERY_UNFAVORABLE
//! ```
//!
//! ## Álgebra do Antecedente
//!
//! | Nó | Força |
//! |----|-------|
//! | `Is(var, termo)` | `μ_termo(valor de var)` |
//! | `And([..])` | `min` dos filhos |
//! | `Or([..])` | `max` dos filhos |
//!
//! As tabelas de regras embarcadas usam apenas AND, mas o avaliador suporta
//! OR (e aninhamento arbitrário) porque faz parte do contrato Mamdani.
//!
//! ## Validação Antecipada
//!
//! Uma [`RuleBase`] é **compilada** contra as variáveis do sistema:
//! nomes viram índices e qualquer referência a variável ou termo
//! inexistente aborta a construção com [`FuzzyError`]. Nada disso pode
//! aparecer no meio de uma avaliação.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::{FuzzyError, FuzzyResult};
use super::variable::LinguisticVariable;

/// Cláusula `variável is termo`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Clause {
    pub variable: String,
    pub term: String,
}

impl Clause {
    pub fn new(variable: impl Into<String>, term: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
            term: term.into(),
        }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} is {}", self.variable, self.term.to_uppercase())
    }
}

/// Árvore de condições de uma regra.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Antecedent {
    Is(Clause),
    And(Vec<Antecedent>),
    Or(Vec<Antecedent>),
}

impl Antecedent {
    pub fn is(variable: &str, term: &str) -> Self {
        Antecedent::Is(Clause::new(variable, term))
    }

    /// Conjunção de pares `(variável, termo)`.
    ///
    /// Um único par vira `Is` diretamente.
    pub fn all(pairs: &[(&str, &str)]) -> Self {
        match pairs {
            [(v, t)] => Antecedent::is(v, t),
            _ => Antecedent::And(pairs.iter().map(|(v, t)| Antecedent::is(v, t)).collect()),
        }
    }

    /// Disjunção de pares `(variável, termo)`.
    pub fn any(pairs: &[(&str, &str)]) -> Self {
        match pairs {
            [(v, t)] => Antecedent::is(v, t),
            _ => Antecedent::Or(pairs.iter().map(|(v, t)| Antecedent::is(v, t)).collect()),
        }
    }

    /// Força de disparo dado um provedor de graus por cláusula.
    ///
    /// AND = `min`, OR = `max`.
    pub fn strength<F>(&self, degree_of: &F) -> f64
    where
        F: Fn(&Clause) -> f64,
    {
        match self {
            Antecedent::Is(clause) => degree_of(clause),
            Antecedent::And(children) => children
                .iter()
                .map(|c| c.strength(degree_of))
                .fold(1.0, f64::min),
            Antecedent::Or(children) => children
                .iter()
                .map(|c| c.strength(degree_of))
                .fold(0.0, f64::max),
        }
    }

    /// Todas as cláusulas, em ordem de leitura.
    pub fn clauses(&self) -> Vec<&Clause> {
        let mut out = Vec::new();
        self.collect_clauses(&mut out);
        out
    }

    fn collect_clauses<'a>(&'a self, out: &mut Vec<&'a Clause>) {
        match self {
            Antecedent::Is(clause) => out.push(clause),
            Antecedent::And(children) | Antecedent::Or(children) => {
                for c in children {
                    c.collect_clauses(out);
                }
            }
        }
    }

    /// Chave canônica da combinação de termos.
    ///
    /// `price=very_high&consumption=very_high`; disjunções aparecem entre
    /// parênteses separadas por `|`. É a chave da tabela de interpretações.
    pub fn key(&self) -> String {
        match self {
            Antecedent::Is(c) => format!("{}={}", c.variable, c.term),
            Antecedent::And(children) => children
                .iter()
                .map(|c| c.nested_key())
                .collect::<Vec<_>>()
                .join("&"),
            Antecedent::Or(children) => format!(
                "({})",
                children
                    .iter()
                    .map(|c| c.nested_key())
                    .collect::<Vec<_>>()
                    .join("|")
            ),
        }
    }

    fn nested_key(&self) -> String {
        match self {
            Antecedent::And(_) => format!("({})", self.key()),
            _ => self.key(),
        }
    }

    /// Chave independente da ordem das cláusulas.
    ///
    /// Mesmo formato de [`key()`](Self::key), mas com os filhos de cada
    /// `And`/`Or` ordenados: `consumption=low&price=high` e
    /// `price=high&consumption=low` dão a mesma chave.
    pub fn canonical_key(&self) -> String {
        match self {
            Antecedent::Is(_) => self.key(),
            Antecedent::And(children) => sorted_keys(children).join("&"),
            Antecedent::Or(children) => format!("({})", sorted_keys(children).join("|")),
        }
    }

    /// Lê de volta uma chave no formato de [`key()`](Self::key).
    ///
    /// `None` se a chave estiver malformada (parênteses desbalanceados,
    /// cláusula sem `=`, partes vazias).
    pub fn parse_key(key: &str) -> Option<Self> {
        let key = key.trim();
        if let Some(inner) = strip_outer_parens(key) {
            return Self::parse_key(inner);
        }
        for sep in ['&', '|'] {
            let parts = split_top_level(key, sep)?;
            if parts.len() > 1 {
                let children = parts
                    .into_iter()
                    .map(Self::parse_key)
                    .collect::<Option<Vec<_>>>()?;
                return Some(if sep == '&' {
                    Antecedent::And(children)
                } else {
                    Antecedent::Or(children)
                });
            }
        }
        let (variable, term) = key.split_once('=')?;
        let (variable, term) = (variable.trim(), term.trim());
        if variable.is_empty() || term.is_empty() || term.contains(['=', '(', ')']) {
            return None;
        }
        Some(Antecedent::is(variable, term))
    }

    fn validate_shape(&self, rule: &str) -> FuzzyResult<()> {
        match self {
            Antecedent::Is(_) => Ok(()),
            Antecedent::And(children) | Antecedent::Or(children) => {
                if children.is_empty() {
                    return Err(FuzzyError::EmptyAntecedent {
                        rule: rule.to_string(),
                    });
                }
                children.iter().try_for_each(|c| c.validate_shape(rule))
            }
        }
    }
}

fn sorted_keys(children: &[Antecedent]) -> Vec<String> {
    let mut keys: Vec<String> = children
        .iter()
        .map(|c| match c {
            Antecedent::And(_) => format!("({})", c.canonical_key()),
            _ => c.canonical_key(),
        })
        .collect();
    keys.sort();
    keys
}

/// `(...)` envolvendo a chave inteira, sem os parênteses.
fn strip_outer_parens(key: &str) -> Option<&str> {
    let inner = key.strip_prefix('(')?.strip_suffix(')')?;
    // "(a)&(b)" começa e termina com parênteses mas não é um grupo só
    let mut depth = 0i32;
    for ch in inner.chars() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
            }
            _ => {}
        }
    }
    (depth == 0).then_some(inner)
}

/// Divide em `sep` fora de parênteses. `None` se desbalanceado.
fn split_top_level(key: &str, sep: char) -> Option<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, ch) in key.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
            }
            c if c == sep && depth == 0 => {
                parts.push(&key[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    if depth != 0 {
        return None;
    }
    parts.push(&key[start..]);
    Some(parts)
}

impl fmt::Display for Antecedent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Antecedent::Is(c) => write!(f, "{}", c),
            Antecedent::And(children) | Antecedent::Or(children) => {
                let sep = if matches!(self, Antecedent::And(_)) {
                    " AND "
                } else {
                    " OR "
                };
                for (i, c) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(sep)?;
                    }
                    match c {
                        Antecedent::Is(_) => write!(f, "{}", c)?,
                        _ => write!(f, "({})", c)?,
                    }
                }
                Ok(())
            }
        }
    }
}

fn default_weight() -> f64 {
    1.0
}

/// Regra Mamdani: `IF antecedente THEN consequente`, com peso opcional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Identificador estável (ex: `"M5"`), usado no rastreamento.
    pub id: String,
    pub antecedent: Antecedent,
    pub consequent: Clause,
    /// Multiplica a força de disparo. Padrão 1.0 (as tabelas não ponderam).
    #[serde(default = "default_weight")]
    pub weight: f64,
}

impl Rule {
    pub fn new(id: impl Into<String>, antecedent: Antecedent, consequent: Clause) -> Self {
        Self {
            id: id.into(),
            antecedent,
            consequent,
            weight: 1.0,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// `IF ... THEN ...` legível.
    pub fn describe(&self) -> String {
        format!("IF {} THEN {}", self.antecedent, self.consequent)
    }
}

/// Coleção ordenada de regras que escrevem numa única variável de saída.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleBase {
    pub rules: Vec<Rule>,
}

impl RuleBase {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Resolve nomes em índices e valida a base contra as variáveis.
    ///
    /// Falha se alguma regra referenciar variável/termo inexistente,
    /// escrever noutra saída, tiver antecedente vazio ou peso inválido.
    pub fn compile(
        &self,
        inputs: &[LinguisticVariable],
        output: &LinguisticVariable,
    ) -> FuzzyResult<Vec<CompiledRule>> {
        self.rules
            .iter()
            .map(|rule| compile_rule(rule, inputs, output))
            .collect()
    }
}

/// Regra com nomes já resolvidos em índices.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledRule {
    pub antecedent: CompiledAntecedent,
    /// Índice do termo consequente na variável de saída.
    pub consequent_term: usize,
    pub weight: f64,
}

impl CompiledRule {
    /// Força de disparo a partir dos graus já fuzzificados
    /// (`degrees[variável][termo]`).
    pub fn strength(&self, degrees: &[Vec<f64>]) -> f64 {
        self.weight * self.antecedent.strength(degrees)
    }
}

/// Antecedente compilado: `Is` aponta para `(variável, termo)` por índice.
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledAntecedent {
    Is { variable: usize, term: usize },
    And(Vec<CompiledAntecedent>),
    Or(Vec<CompiledAntecedent>),
}

impl CompiledAntecedent {
    pub fn strength(&self, degrees: &[Vec<f64>]) -> f64 {
        match self {
            CompiledAntecedent::Is { variable, term } => degrees[*variable][*term],
            CompiledAntecedent::And(children) => children
                .iter()
                .map(|c| c.strength(degrees))
                .fold(1.0, f64::min),
            CompiledAntecedent::Or(children) => children
                .iter()
                .map(|c| c.strength(degrees))
                .fold(0.0, f64::max),
        }
    }
}

/// Resolve `(variável, termo)` em índices dentro de `inputs`.
pub(crate) fn resolve_clause(
    rule: &str,
    clause: &Clause,
    inputs: &[LinguisticVariable],
) -> FuzzyResult<(usize, usize)> {
    let variable = inputs
        .iter()
        .position(|v| v.name == clause.variable)
        .ok_or_else(|| FuzzyError::UnknownVariable {
            rule: rule.to_string(),
            variable: clause.variable.clone(),
        })?;
    let term = inputs[variable]
        .term_index(&clause.term)
        .ok_or_else(|| FuzzyError::UnknownTerm {
            rule: rule.to_string(),
            variable: clause.variable.clone(),
            term: clause.term.clone(),
        })?;
    Ok((variable, term))
}

fn compile_antecedent(
    rule: &str,
    antecedent: &Antecedent,
    inputs: &[LinguisticVariable],
) -> FuzzyResult<CompiledAntecedent> {
    Ok(match antecedent {
        Antecedent::Is(clause) => {
            let (variable, term) = resolve_clause(rule, clause, inputs)?;
            CompiledAntecedent::Is { variable, term }
        }
        Antecedent::And(children) => CompiledAntecedent::And(
            children
                .iter()
                .map(|c| compile_antecedent(rule, c, inputs))
                .collect::<FuzzyResult<_>>()?,
        ),
        Antecedent::Or(children) => CompiledAntecedent::Or(
            children
                .iter()
                .map(|c| compile_antecedent(rule, c, inputs))
                .collect::<FuzzyResult<_>>()?,
        ),
    })
}

fn compile_rule(
    rule: &Rule,
    inputs: &[LinguisticVariable],
    output: &LinguisticVariable,
) -> FuzzyResult<CompiledRule> {
    rule.antecedent.validate_shape(&rule.id)?;

    if !(rule.weight > 0.0 && rule.weight <= 1.0) {
        return Err(FuzzyError::InvalidWeight {
            rule: rule.id.clone(),
            weight: rule.weight,
        });
    }
    if rule.consequent.variable != output.name {
        return Err(FuzzyError::ConsequentMismatch {
            rule: rule.id.clone(),
            expected: output.name.clone(),
            found: rule.consequent.variable.clone(),
        });
    }
    let consequent_term =
        output
            .term_index(&rule.consequent.term)
            .ok_or_else(|| FuzzyError::UnknownTerm {
                rule: rule.id.clone(),
                variable: output.name.clone(),
                term: rule.consequent.term.clone(),
            })?;

    Ok(CompiledRule {
        antecedent: compile_antecedent(&rule.id, &rule.antecedent, inputs)?,
        consequent_term,
        weight: rule.weight,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> Vec<LinguisticVariable> {
        vec![
            LinguisticVariable::antecedent("price", 0.0, 100.0)
                .trap("low", 0.0, 0.0, 30.0, 60.0)
                .trap("high", 40.0, 70.0, 100.0, 100.0),
            LinguisticVariable::antecedent("load", 0.0, 100.0)
                .trap("low", 0.0, 0.0, 30.0, 60.0)
                .trap("high", 40.0, 70.0, 100.0, 100.0),
        ]
    }

    fn output() -> LinguisticVariable {
        LinguisticVariable::consequent("risk", 0.0, 100.0)
            .trap("calm", 0.0, 0.0, 20.0, 50.0)
            .trap("alert", 50.0, 80.0, 100.0, 100.0)
    }

    fn degrees(price: f64, load: f64) -> Vec<Vec<f64>> {
        let vars = inputs();
        vec![vars[0].degrees(price), vars[1].degrees(load)]
    }

    // ─── Álgebra ───────────────────────────────────────────────

    #[test]
    fn and_is_min_or_is_max() {
        let lookup = |c: &Clause| if c.variable == "price" { 0.8 } else { 0.3 };
        let and = Antecedent::all(&[("price", "high"), ("load", "high")]);
        let or = Antecedent::any(&[("price", "high"), ("load", "high")]);
        assert_eq!(and.strength(&lookup), 0.3);
        assert_eq!(or.strength(&lookup), 0.8);
    }

    #[test]
    fn nested_tree_strength() {
        // (price high AND load high) OR load low
        let tree = Antecedent::Or(vec![
            Antecedent::all(&[("price", "high"), ("load", "high")]),
            Antecedent::is("load", "low"),
        ]);
        let rules = RuleBase::new(vec![Rule::new("N1", tree, Clause::new("risk", "alert"))]);
        let compiled = rules.compile(&inputs(), &output()).unwrap();
        // price=55 → high=0.5; load=55 → high=0.5, low=1/6
        let s = compiled[0].strength(&degrees(55.0, 55.0));
        assert!((s - 0.5).abs() < 1e-9);
    }

    #[test]
    fn and_strength_is_monotonic_in_each_clause() {
        let rules = RuleBase::new(vec![Rule::new(
            "A",
            Antecedent::all(&[("price", "high"), ("load", "high")]),
            Clause::new("risk", "alert"),
        )]);
        let rule = &rules.compile(&inputs(), &output()).unwrap()[0];
        for load in [45.0, 55.0, 80.0] {
            let mut prev = -1.0;
            // price "high" cresce monotonicamente de 40 a 100
            for p in 40..=100 {
                let s = rule.strength(&degrees(p as f64, load));
                assert!(s >= prev - 1e-12);
                prev = s;
            }
        }
    }

    #[test]
    fn or_strength_is_monotonic_in_each_clause() {
        let rules = RuleBase::new(vec![Rule::new(
            "O",
            Antecedent::any(&[("price", "high"), ("load", "low")]),
            Clause::new("risk", "alert"),
        )]);
        let rule = &rules.compile(&inputs(), &output()).unwrap()[0];
        for load in [10.0, 45.0, 90.0] {
            let mut prev = -1.0;
            for p in 40..=100 {
                let s = rule.strength(&degrees(p as f64, load));
                assert!(s >= prev - 1e-12);
                prev = s;
            }
        }
    }

    #[test]
    fn weight_scales_strength() {
        let rules = RuleBase::new(vec![Rule::new(
            "W",
            Antecedent::is("price", "high"),
            Clause::new("risk", "alert"),
        )
        .with_weight(0.5)]);
        let rule = &rules.compile(&inputs(), &output()).unwrap()[0];
        assert!((rule.strength(&degrees(90.0, 0.0)) - 0.5).abs() < 1e-9);
    }

    // ─── Descrição e chave ─────────────────────────────────────

    #[test]
    fn describe_and_key() {
        let rule = Rule::new(
            "M1",
            Antecedent::all(&[("price", "very_high"), ("consumption", "very_high")]),
            Clause::new("market_condition", "very_unfavorable"),
        );
        assert_eq!(
            rule.describe(),
            "IF price is VERY_HIGH AND consumption is VERY_HIGH THEN market_condition is VERY_UNFAVORABLE"
        );
        assert_eq!(
            rule.antecedent.key(),
            "price=very_high&consumption=very_high"
        );
    }

    #[test]
    fn canonical_key_ignores_clause_order() {
        let a = Antecedent::all(&[("price", "very_high"), ("consumption", "very_high")]);
        let b = Antecedent::all(&[("consumption", "very_high"), ("price", "very_high")]);
        assert_ne!(a.key(), b.key());
        assert_eq!(a.canonical_key(), b.canonical_key());
        assert_eq!(a.canonical_key(), "consumption=very_high&price=very_high");

        let or = Antecedent::Or(vec![
            Antecedent::is("load", "low"),
            Antecedent::all(&[("price", "high"), ("load", "high")]),
        ]);
        assert_eq!(or.canonical_key(), "((load=high&price=high)|load=low)");
    }

    #[test]
    fn parse_key_reads_back_every_shape() {
        let nested = Antecedent::Or(vec![
            Antecedent::all(&[("price", "high"), ("load", "high")]),
            Antecedent::is("load", "low"),
        ]);
        let mixed = Antecedent::And(vec![
            Antecedent::any(&[("a", "x"), ("b", "y")]),
            Antecedent::is("c", "z"),
        ]);
        for a in [
            Antecedent::is("price", "high"),
            Antecedent::all(&[("price", "high"), ("consumption", "low")]),
            nested,
            mixed,
        ] {
            assert_eq!(Antecedent::parse_key(&a.key()), Some(a.clone()), "{}", a.key());
        }
    }

    #[test]
    fn parse_key_rejects_malformed() {
        for bad in ["", "price", "price=", "=high", "(price=high", "price=high)", "a=x&", "a=x&&b=y"] {
            assert_eq!(Antecedent::parse_key(bad), None, "{:?}", bad);
        }
    }

    #[test]
    fn or_key_and_display() {
        let a = Antecedent::Or(vec![
            Antecedent::all(&[("price", "high"), ("load", "high")]),
            Antecedent::is("load", "low"),
        ]);
        assert_eq!(a.key(), "((price=high&load=high)|load=low)");
        assert_eq!(
            a.to_string(),
            "(price is HIGH AND load is HIGH) OR load is LOW"
        );
    }

    // ─── Validação ─────────────────────────────────────────────

    #[test]
    fn unknown_term_aborts_compilation() {
        let rules = RuleBase::new(vec![Rule::new(
            "X",
            Antecedent::is("price", "extreme"),
            Clause::new("risk", "alert"),
        )]);
        let err = rules.compile(&inputs(), &output()).unwrap_err();
        assert_eq!(
            err,
            FuzzyError::UnknownTerm {
                rule: "X".into(),
                variable: "price".into(),
                term: "extreme".into()
            }
        );
    }

    #[test]
    fn unknown_variable_aborts_compilation() {
        let rules = RuleBase::new(vec![Rule::new(
            "X",
            Antecedent::is("hour", "night"),
            Clause::new("risk", "alert"),
        )]);
        assert!(matches!(
            rules.compile(&inputs(), &output()),
            Err(FuzzyError::UnknownVariable { .. })
        ));
    }

    #[test]
    fn consequent_must_target_own_output() {
        let rules = RuleBase::new(vec![Rule::new(
            "X",
            Antecedent::is("price", "low"),
            Clause::new("other", "calm"),
        )]);
        assert!(matches!(
            rules.compile(&inputs(), &output()),
            Err(FuzzyError::ConsequentMismatch { .. })
        ));
    }

    #[test]
    fn unknown_consequent_term_is_rejected() {
        let rules = RuleBase::new(vec![Rule::new(
            "X",
            Antecedent::is("price", "low"),
            Clause::new("risk", "panic"),
        )]);
        assert!(matches!(
            rules.compile(&inputs(), &output()),
            Err(FuzzyError::UnknownTerm { .. })
        ));
    }

    #[test]
    fn empty_antecedent_and_bad_weight_are_rejected() {
        let empty = RuleBase::new(vec![Rule::new(
            "E",
            Antecedent::And(vec![]),
            Clause::new("risk", "calm"),
        )]);
        assert!(matches!(
            empty.compile(&inputs(), &output()),
            Err(FuzzyError::EmptyAntecedent { .. })
        ));

        let heavy = RuleBase::new(vec![Rule::new(
            "H",
            Antecedent::is("price", "low"),
            Clause::new("risk", "calm"),
        )
        .with_weight(1.5)]);
        assert!(matches!(
            heavy.compile(&inputs(), &output()),
            Err(FuzzyError::InvalidWeight { .. })
        ));
    }

    #[test]
    fn rule_deserializes_with_default_weight() {
        let json = r#"{
            "id": "J1",
            "antecedent": {"and": [
                {"is": {"variable": "price", "term": "low"}},
                {"is": {"variable": "load", "term": "low"}}
            ]},
            "consequent": {"variable": "risk", "term": "calm"}
        }"#;
        let rule: Rule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.weight, 1.0);
        assert_eq!(rule.antecedent, Antecedent::all(&[("price", "low"), ("load", "low")]));
    }
}
