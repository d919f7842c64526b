//! Declarative validation rules attached to request types.
//!
//! A [`RuleSet`] is built once at startup and run by the validation stage
//! against every dispatched request of its type. Rules are independent: each
//! one reports its own failures regardless of the others. Within one field,
//! [`FieldRules::stop_on_first_failure`] stops that field's chain at its
//! first failing check.
//!
//! ```
//! use storefront_core::validation::RuleSet;
//!
//! struct AddCartItem {
//!     quantity: u32,
//!     note: Option<String>,
//! }
//!
//! let rules = RuleSet::<AddCartItem>::new()
//!     .field("Quantity", |r| &r.quantity, |f| f.greater_than(0))
//!     .field("Note", |r| &r.note, |f| f.max_length(200));
//!
//! let failures = rules.validate(&AddCartItem { quantity: 0, note: None });
//! assert_eq!(failures.len(), 1);
//! assert_eq!(failures[0].field, "Quantity");
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt::Display;

use regex::Regex;
use uuid::Uuid;

use crate::error::ValidationFailure;

// ---------------------------------------------------------------------------
// NonDefault
// ---------------------------------------------------------------------------

/// Whether a present value is meaningfully set for its type.
///
/// Empty strings, empty collections and the nil UUID are default; numbers
/// and booleans are always considered set once present.
pub trait NonDefault {
    fn is_non_default(&self) -> bool;
}

impl NonDefault for str {
    fn is_non_default(&self) -> bool {
        !self.is_empty()
    }
}

impl NonDefault for String {
    fn is_non_default(&self) -> bool {
        !self.is_empty()
    }
}

impl NonDefault for Uuid {
    fn is_non_default(&self) -> bool {
        !self.is_nil()
    }
}

impl<T> NonDefault for Vec<T> {
    fn is_non_default(&self) -> bool {
        !self.is_empty()
    }
}

impl<T> NonDefault for BTreeSet<T> {
    fn is_non_default(&self) -> bool {
        !self.is_empty()
    }
}

impl<K, V> NonDefault for BTreeMap<K, V> {
    fn is_non_default(&self) -> bool {
        !self.is_empty()
    }
}

impl<T, S> NonDefault for HashSet<T, S> {
    fn is_non_default(&self) -> bool {
        !self.is_empty()
    }
}

impl<K, V, S> NonDefault for HashMap<K, V, S> {
    fn is_non_default(&self) -> bool {
        !self.is_empty()
    }
}

macro_rules! always_non_default {
    ($($ty:ty),* $(,)?) => {
        $(
            impl NonDefault for $ty {
                fn is_non_default(&self) -> bool {
                    true
                }
            }
        )*
    };
}

always_non_default!(bool, u8, u16, u32, u64, usize, i8, i16, i32, i64, isize, f32, f64);

/// Passes when `value` is absent, or present and non-default.
#[must_use]
pub fn null_or_non_default<T: NonDefault + ?Sized>(value: Option<&T>) -> bool {
    value.map_or(true, T::is_non_default)
}

// ---------------------------------------------------------------------------
// TextValue
// ---------------------------------------------------------------------------

/// Values that may carry text, for the string checks. `None` skips the check.
pub trait TextValue {
    fn text(&self) -> Option<&str>;
}

impl TextValue for String {
    fn text(&self) -> Option<&str> {
        Some(self)
    }
}

impl TextValue for Option<String> {
    fn text(&self) -> Option<&str> {
        self.as_deref()
    }
}

fn looks_like_email(text: &str) -> bool {
    let mut parts = text.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty() && !domain.is_empty() && !text.contains(char::is_whitespace)
        }
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// FieldRules
// ---------------------------------------------------------------------------

type Predicate<V> = Box<dyn Fn(&V) -> bool + Send + Sync>;

struct Check<V> {
    passes: Predicate<V>,
    message: String,
}

/// Ordered checks for one field of a request.
pub struct FieldRules<V> {
    field: &'static str,
    checks: Vec<Check<V>>,
    stop_on_first_failure: bool,
}

impl<V: 'static> FieldRules<V> {
    fn new(field: &'static str) -> Self {
        Self {
            field,
            checks: Vec::new(),
            stop_on_first_failure: false,
        }
    }

    /// Adds a custom check.
    #[must_use]
    pub fn must<P>(mut self, predicate: P, message: impl Into<String>) -> Self
    where
        P: Fn(&V) -> bool + Send + Sync + 'static,
    {
        self.checks.push(Check {
            passes: Box::new(predicate),
            message: message.into(),
        });
        self
    }

    /// Replaces the message of the most recently added check.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        if let Some(last) = self.checks.last_mut() {
            last.message = message.into();
        }
        self
    }

    /// Stops this field's chain at its first failing check.
    #[must_use]
    pub fn stop_on_first_failure(mut self) -> Self {
        self.stop_on_first_failure = true;
        self
    }

    fn run(&self, value: &V, failures: &mut Vec<ValidationFailure>) {
        for check in &self.checks {
            if !(check.passes)(value) {
                failures.push(ValidationFailure::new(self.field, check.message.clone()));
                if self.stop_on_first_failure {
                    return;
                }
            }
        }
    }
}

impl<V: NonDefault + 'static> FieldRules<V> {
    /// Fails on empty strings, empty collections and the nil UUID.
    #[must_use]
    pub fn not_empty(self) -> Self {
        let message = format!("'{}' must not be empty.", self.field);
        self.must(<V as NonDefault>::is_non_default, message)
    }
}

impl<T: NonDefault + 'static> FieldRules<Option<T>> {
    /// Fails when the value is absent.
    #[must_use]
    pub fn not_null(self) -> Self {
        let message = format!("'{}' must not be empty.", self.field);
        self.must(Option::<T>::is_some, message)
    }

    /// Passes when absent; when present, fails on default values.
    #[must_use]
    pub fn null_or_not_default(self) -> Self {
        let message = format!("'{}' must be empty or hold a non-default value.", self.field);
        self.must(|value: &Option<T>| null_or_non_default(value.as_ref()), message)
    }
}

impl<V> FieldRules<V>
where
    V: PartialOrd + Display + Send + Sync + 'static,
{
    #[must_use]
    pub fn greater_than(self, bound: V) -> Self {
        let message = format!("'{}' must be greater than '{bound}'.", self.field);
        self.must(move |value: &V| *value > bound, message)
    }

    #[must_use]
    pub fn greater_than_or_equal(self, bound: V) -> Self {
        let message = format!(
            "'{}' must be greater than or equal to '{bound}'.",
            self.field
        );
        self.must(move |value: &V| *value >= bound, message)
    }

    #[must_use]
    pub fn less_than_or_equal(self, bound: V) -> Self {
        let message = format!("'{}' must be less than or equal to '{bound}'.", self.field);
        self.must(move |value: &V| *value <= bound, message)
    }
}

impl<V: TextValue + 'static> FieldRules<V> {
    /// Fails when the text is longer than `max` characters.
    #[must_use]
    pub fn max_length(self, max: usize) -> Self {
        let message = format!(
            "The length of '{}' must be {max} characters or fewer.",
            self.field
        );
        self.must(
            move |value: &V| value.text().map_or(true, |t| t.chars().count() <= max),
            message,
        )
    }

    /// Fails when the text does not match `pattern`.
    #[must_use]
    pub fn matches(self, pattern: Regex) -> Self {
        let message = format!("'{}' is not in the correct format.", self.field);
        self.must(
            move |value: &V| value.text().map_or(true, |t| pattern.is_match(t)),
            message,
        )
    }

    /// Fails unless the text has the `local@domain` shape.
    #[must_use]
    pub fn email(self) -> Self {
        let message = format!("'{}' is not a valid email address.", self.field);
        self.must(
            |value: &V| value.text().map_or(true, looks_like_email),
            message,
        )
    }
}

// ---------------------------------------------------------------------------
// RuleSet
// ---------------------------------------------------------------------------

/// One independent rule over a request.
trait Rule<R>: Send + Sync {
    fn check(&self, request: &R, failures: &mut Vec<ValidationFailure>);
}

struct FieldRule<A, V> {
    accessor: A,
    rules: FieldRules<V>,
}

impl<R, V, A> Rule<R> for FieldRule<A, V>
where
    A: Fn(&R) -> &V + Send + Sync,
    V: 'static,
{
    fn check(&self, request: &R, failures: &mut Vec<ValidationFailure>) {
        self.rules.run((self.accessor)(request), failures);
    }
}

struct RequestRule<P> {
    field: &'static str,
    predicate: P,
    message: String,
}

impl<R, P> Rule<R> for RequestRule<P>
where
    P: Fn(&R) -> bool + Send + Sync,
{
    fn check(&self, request: &R, failures: &mut Vec<ValidationFailure>) {
        if !(self.predicate)(request) {
            failures.push(ValidationFailure::new(self.field, self.message.clone()));
        }
    }
}

/// All rules registered for one request type.
pub struct RuleSet<R> {
    rules: Vec<Box<dyn Rule<R>>>,
}

impl<R: 'static> RuleSet<R> {
    #[must_use]
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Adds the checks built by `build` for the field returned by `accessor`.
    #[must_use]
    pub fn field<V, A, B>(mut self, name: &'static str, accessor: A, build: B) -> Self
    where
        V: 'static,
        A: Fn(&R) -> &V + Send + Sync + 'static,
        B: FnOnce(FieldRules<V>) -> FieldRules<V>,
    {
        let rules = build(FieldRules::new(name));
        self.rules.push(Box::new(FieldRule { accessor, rules }));
        self
    }

    /// Adds a rule over the whole request, reported under `field`.
    #[must_use]
    pub fn must<P>(mut self, field: &'static str, predicate: P, message: impl Into<String>) -> Self
    where
        P: Fn(&R) -> bool + Send + Sync + 'static,
    {
        self.rules.push(Box::new(RequestRule {
            field,
            predicate,
            message: message.into(),
        }));
        self
    }

    /// Runs every rule and collects all failures in rule order.
    #[must_use]
    pub fn validate(&self, request: &R) -> Vec<ValidationFailure> {
        let mut failures = Vec::new();
        for rule in &self.rules {
            rule.check(request, &mut failures);
        }
        failures
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<R: 'static> Default for RuleSet<R> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    struct AddCartItem {
        product_id: Uuid,
        quantity: i32,
        voucher: Option<String>,
        email: String,
    }

    fn valid() -> AddCartItem {
        AddCartItem {
            product_id: Uuid::new_v4(),
            quantity: 2,
            voucher: None,
            email: "ada@example.com".to_string(),
        }
    }

    fn rules() -> RuleSet<AddCartItem> {
        RuleSet::new()
            .field("ProductId", |r: &AddCartItem| &r.product_id, |f| f.not_empty())
            .field("Quantity", |r: &AddCartItem| &r.quantity, |f| {
                f.greater_than(0).less_than_or_equal(99)
            })
            .field("Voucher", |r: &AddCartItem| &r.voucher, |f| {
                f.null_or_not_default().max_length(12)
            })
            .field("Email", |r: &AddCartItem| &r.email, |f| f.email())
    }

    #[test]
    fn valid_request_has_no_failures() {
        assert!(rules().validate(&valid()).is_empty());
    }

    #[test]
    fn quantity_must_be_positive() {
        let request = AddCartItem {
            quantity: 0,
            ..valid()
        };
        let failures = rules().validate(&request);
        assert_eq!(
            failures,
            vec![ValidationFailure::new(
                "Quantity",
                "'Quantity' must be greater than '0'."
            )]
        );
    }

    #[test]
    fn rules_are_independent() {
        let request = AddCartItem {
            product_id: Uuid::nil(),
            quantity: -1,
            voucher: Some(String::new()),
            email: "nope".to_string(),
        };
        let fields: Vec<String> = rules()
            .validate(&request)
            .into_iter()
            .map(|f| f.field)
            .collect();
        assert_eq!(fields, vec!["ProductId", "Quantity", "Voucher", "Email"]);
    }

    #[test]
    fn field_chain_reports_every_failure_by_default() {
        let set = RuleSet::<AddCartItem>::new().field(
            "Quantity",
            |r: &AddCartItem| &r.quantity,
            |f| f.greater_than(5).greater_than(10),
        );
        let request = AddCartItem {
            quantity: 1,
            ..valid()
        };
        assert_eq!(set.validate(&request).len(), 2);
    }

    #[test]
    fn stop_on_first_failure_short_circuits_one_field_only() {
        let set = RuleSet::<AddCartItem>::new()
            .field("Quantity", |r: &AddCartItem| &r.quantity, |f| {
                f.greater_than(5).greater_than(10).stop_on_first_failure()
            })
            .field("ProductId", |r: &AddCartItem| &r.product_id, |f| f.not_empty());
        let request = AddCartItem {
            quantity: 1,
            product_id: Uuid::nil(),
            ..valid()
        };
        let failures = set.validate(&request);
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].message, "'Quantity' must be greater than '5'.");
        assert_eq!(failures[1].field, "ProductId");
    }

    #[test]
    fn with_message_overrides_last_check() {
        let set = RuleSet::<AddCartItem>::new().field(
            "Quantity",
            |r: &AddCartItem| &r.quantity,
            |f| f.greater_than(0).with_message("Add at least one item."),
        );
        let request = AddCartItem {
            quantity: 0,
            ..valid()
        };
        assert_eq!(set.validate(&request)[0].message, "Add at least one item.");
    }

    #[test]
    fn request_level_rule_reports_under_field() {
        let set = RuleSet::<AddCartItem>::new().must(
            "Voucher",
            |r| r.voucher.is_none() || r.quantity > 1,
            "Vouchers need at least two items.",
        );
        let request = AddCartItem {
            quantity: 1,
            voucher: Some("SAVE".to_string()),
            ..valid()
        };
        assert_eq!(
            set.validate(&request),
            vec![ValidationFailure::new("Voucher", "Vouchers need at least two items.")]
        );
    }

    #[test]
    fn matches_skips_absent_text() {
        let code = Regex::new("^[A-Z0-9]+$").unwrap();
        let set = RuleSet::<AddCartItem>::new().field(
            "Voucher",
            |r: &AddCartItem| &r.voucher,
            |f| f.matches(code),
        );
        assert!(set.validate(&valid()).is_empty());
        let request = AddCartItem {
            voucher: Some("save-10".to_string()),
            ..valid()
        };
        assert_eq!(
            set.validate(&request)[0].message,
            "'Voucher' is not in the correct format."
        );
    }

    #[test]
    fn null_or_non_default_semantics() {
        assert!(null_or_non_default::<String>(None));
        assert!(!null_or_non_default(Some(&String::new())));
        assert!(null_or_non_default(Some(&"x".to_string())));
        assert!(!null_or_non_default(Some(&Uuid::nil())));
        assert!(null_or_non_default(Some(&Uuid::new_v4())));
        assert!(!null_or_non_default(Some(&Vec::<u8>::new())));
        assert!(null_or_non_default(Some(&vec![1u8])));
        assert!(null_or_non_default(Some(&0i64)));
        assert!(null_or_non_default(Some(&false)));
    }

    #[test]
    fn not_null_rejects_absent_value() {
        let set = RuleSet::<AddCartItem>::new().field(
            "Voucher",
            |r: &AddCartItem| &r.voucher,
            |f| f.not_null(),
        );
        let failures = set.validate(&AddCartItem {
            voucher: None,
            ..valid()
        });
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].field, "Voucher");
        assert_eq!(failures[0].message, "'Voucher' must not be empty.");

        let present = AddCartItem {
            voucher: Some("SAVE10".to_string()),
            ..valid()
        };
        assert!(set.validate(&present).is_empty());
    }

    #[test]
    fn email_shape() {
        assert!(looks_like_email("a@b"));
        assert!(!looks_like_email("@b"));
        assert!(!looks_like_email("a@"));
        assert!(!looks_like_email("a@b@c"));
        assert!(!looks_like_email("a b@c"));
    }
}
