//! Guarded multi-step flows (address entry, admin product edit).
//!
//! Each flow is an ordered list of steps; moving forward requires the
//! current step's guard to accept the draft.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum WizardError {
    #[error("{step} is incomplete: {reason}")]
    Incomplete { step: &'static str, reason: String },
    #[error("already at the last step")]
    AtEnd,
    #[error("already at the first step")]
    AtStart,
}

/// A step of a wizard over draft type `D`.
pub trait WizardStep: Copy + PartialEq + std::fmt::Debug + 'static {
    type Draft;

    /// All steps, in order.
    const STEPS: &'static [Self];

    fn name(self) -> &'static str;

    /// Returns the reason the draft cannot leave this step, if any.
    fn check(self, draft: &Self::Draft) -> Option<String>;
}

#[derive(Debug, Clone)]
pub struct Wizard<S: WizardStep> {
    index: usize,
    _step: std::marker::PhantomData<S>,
}

impl<S: WizardStep> Default for Wizard<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: WizardStep> Wizard<S> {
    pub fn new() -> Self {
        Self {
            index: 0,
            _step: std::marker::PhantomData,
        }
    }

    pub fn current(&self) -> S {
        S::STEPS[self.index]
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 == S::STEPS.len()
    }

    /// (1-based step, total steps)
    pub fn progress(&self) -> (usize, usize) {
        (self.index + 1, S::STEPS.len())
    }

    pub fn next(&mut self, draft: &S::Draft) -> Result<S, WizardError> {
        let step = self.current();
        if let Some(reason) = step.check(draft) {
            return Err(WizardError::Incomplete {
                step: step.name(),
                reason,
            });
        }
        if self.is_last() {
            return Err(WizardError::AtEnd);
        }
        self.index += 1;
        Ok(self.current())
    }

    pub fn back(&mut self) -> Result<S, WizardError> {
        if self.index == 0 {
            return Err(WizardError::AtStart);
        }
        self.index -= 1;
        Ok(self.current())
    }

    /// Runs every guard up to and including the current step.
    pub fn validate(&self, draft: &S::Draft) -> Result<(), WizardError> {
        for step in &S::STEPS[..=self.index] {
            if let Some(reason) = step.check(draft) {
                return Err(WizardError::Incomplete {
                    step: step.name(),
                    reason,
                });
            }
        }
        Ok(())
    }
}

// =============================================================================
// Address entry
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddressDraft {
    pub place_id: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressStep {
    Search,
    Pin,
    Details,
    Review,
}

impl WizardStep for AddressStep {
    type Draft = AddressDraft;

    const STEPS: &'static [Self] = &[
        AddressStep::Search,
        AddressStep::Pin,
        AddressStep::Details,
        AddressStep::Review,
    ];

    fn name(self) -> &'static str {
        match self {
            AddressStep::Search => "search",
            AddressStep::Pin => "pin",
            AddressStep::Details => "details",
            AddressStep::Review => "review",
        }
    }

    fn check(self, draft: &AddressDraft) -> Option<String> {
        match self {
            AddressStep::Search => None,
            AddressStep::Pin => match (draft.latitude, draft.longitude) {
                (Some(_), Some(_)) => None,
                _ => Some("drop a pin on the map".to_string()),
            },
            AddressStep::Details => {
                if draft.line1.trim().is_empty() || draft.city.trim().is_empty() {
                    Some("street and city are required".to_string())
                } else if !is_valid_pincode(&draft.pincode) {
                    Some("pincode must be 6 digits".to_string())
                } else {
                    None
                }
            }
            AddressStep::Review => None,
        }
    }
}

fn is_valid_pincode(pincode: &str) -> bool {
    pincode.len() == 6 && pincode.chars().all(|c| c.is_ascii_digit()) && !pincode.starts_with('0')
}

// =============================================================================
// Admin product edit
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductDraft {
    pub name: String,
    pub category_id: Option<String>,
    pub price_paise: i64,
    pub mrp_paise: Option<i64>,
    pub stock: Option<u32>,
    pub weight_grams: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductEditStep {
    Basics,
    Pricing,
    Stock,
    Review,
}

impl WizardStep for ProductEditStep {
    type Draft = ProductDraft;

    const STEPS: &'static [Self] = &[
        ProductEditStep::Basics,
        ProductEditStep::Pricing,
        ProductEditStep::Stock,
        ProductEditStep::Review,
    ];

    fn name(self) -> &'static str {
        match self {
            ProductEditStep::Basics => "basics",
            ProductEditStep::Pricing => "pricing",
            ProductEditStep::Stock => "stock",
            ProductEditStep::Review => "review",
        }
    }

    fn check(self, draft: &ProductDraft) -> Option<String> {
        match self {
            ProductEditStep::Basics => {
                if draft.name.trim().is_empty() {
                    Some("name is required".to_string())
                } else if draft.category_id.is_none() {
                    Some("pick a category".to_string())
                } else {
                    None
                }
            }
            ProductEditStep::Pricing => {
                if draft.price_paise <= 0 {
                    Some("price must be positive".to_string())
                } else if draft.mrp_paise.is_some_and(|mrp| mrp < draft.price_paise) {
                    Some("MRP cannot be below the selling price".to_string())
                } else {
                    None
                }
            }
            ProductEditStep::Stock => draft
                .stock
                .is_none()
                .then(|| "stock quantity is required".to_string()),
            ProductEditStep::Review => None,
        }
    }
}
