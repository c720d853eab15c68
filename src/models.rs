use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

pub type ProductId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Book {
    pub id: ProductId,
    pub title: String,
    pub price: i64,
    pub stock: i32,
    pub active: bool,
}

impl Book {
    /// Whether `quantity` units of this book may sit in a cart.
    pub fn can_supply(&self, quantity: i32) -> bool {
        self.active && quantity <= self.stock
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CartLine {
    pub line_id: i64,
    pub product_id: ProductId,
    pub title: String,
    pub unit_price: i64,
    pub quantity: i32,
    pub line_subtotal: i64,
}

impl CartLine {
    pub fn new(line_id: i64, book: &Book, quantity: i32) -> Self {
        Self {
            line_id,
            product_id: book.id,
            title: book.title.clone(),
            unit_price: book.price,
            quantity,
            line_subtotal: book.price * i64::from(quantity),
        }
    }

    fn set_quantity(&mut self, quantity: i32) {
        self.quantity = quantity;
        self.line_subtotal = self.unit_price * i64::from(quantity);
    }
}

/// A shopping cart as the server last confirmed it.
///
/// Lines are keyed by `product_id`; every mutation below keeps at most one
/// line per product and drops a line instead of holding it at zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Cart {
    pub owner_id: Uuid,
    pub lines: Vec<CartLine>,
    pub is_active: bool,
}

impl Cart {
    pub fn empty(owner_id: Uuid) -> Self {
        Self {
            owner_id,
            lines: Vec::new(),
            is_active: true,
        }
    }

    pub fn line(&self, product_id: ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.product_id == product_id)
    }

    pub fn quantity_of(&self, product_id: ProductId) -> i32 {
        self.line(product_id).map_or(0, |line| line.quantity)
    }

    pub fn item_count(&self) -> i64 {
        self.lines.iter().map(|line| i64::from(line.quantity)).sum()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Adds one unit to an existing line. Returns `false` when the product has no line yet.
    pub fn increment(&mut self, product_id: ProductId) -> bool {
        match self.line_mut(product_id) {
            Some(line) => {
                line.set_quantity(line.quantity + 1);
                true
            }
            None => false,
        }
    }

    /// Removes one unit; a line reaching zero is dropped. Absent products are left alone.
    pub fn decrement(&mut self, product_id: ProductId) {
        let Some(index) = self.position(product_id) else {
            return;
        };
        let remaining = self.lines[index].quantity - 1;
        if remaining > 0 {
            self.lines[index].set_quantity(remaining);
        } else {
            self.lines.remove(index);
        }
    }

    pub fn remove_line(&mut self, product_id: ProductId) {
        self.lines.retain(|line| line.product_id != product_id);
    }

    /// Sets the quantity of an existing line, removing it for `quantity <= 0`.
    /// Returns `false` when a positive quantity targets a product with no line.
    pub fn set_line_quantity(&mut self, product_id: ProductId, quantity: i32) -> bool {
        if quantity <= 0 {
            self.remove_line(product_id);
            return true;
        }
        match self.line_mut(product_id) {
            Some(line) => {
                line.set_quantity(quantity);
                true
            }
            None => false,
        }
    }

    /// Appends a line for a product that has none yet, or replaces the existing one.
    pub fn upsert_line(&mut self, line: CartLine) {
        match self.position(line.product_id) {
            Some(index) => self.lines[index] = line,
            None => self.lines.push(line),
        }
    }

    fn position(&self, product_id: ProductId) -> Option<usize> {
        self.lines
            .iter()
            .position(|line| line.product_id == product_id)
    }

    fn line_mut(&mut self, product_id: ProductId) -> Option<&mut CartLine> {
        self.lines
            .iter_mut()
            .find(|line| line.product_id == product_id)
    }
}
