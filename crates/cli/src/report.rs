//! End of walkthrough tables

use std::io;

use jiff::Timestamp;
use tabled::{
    builder::Builder,
    settings::{
        Alignment, Color, Style,
        object::{Columns, Rows},
    },
};
use thiserror::Error;

use foodloop::{
    cart::CartError,
    controller::Controller,
    orders::{OrderKey, countdown::format_pickup_countdown},
};

/// Errors raised while writing the report.
#[derive(Debug, Error)]
pub(crate) enum ReportError {
    /// Cart rendering error
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Output error
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Write the cart and every order, active orders first.
pub(crate) fn write(
    mut out: impl io::Write,
    controller: &Controller,
    now: Timestamp,
) -> Result<(), ReportError> {
    if controller.cart().is_empty() {
        writeln!(out, "\nCart is empty")?;
    } else {
        controller
            .cart_summary()?
            .write_to(&mut out, controller.cart(), controller.catalog())?;
    }

    let orders = controller.orders();

    if orders.is_empty() {
        writeln!(out, "\nNo orders")?;

        return Ok(());
    }

    let mut builder = Builder::default();

    builder.push_record([
        "Order",
        "Deal",
        "Qty",
        "Price",
        "Status",
        "Pickup Code",
        "Time Remaining",
    ]);

    for (key, order) in orders.active().into_iter().chain(orders.past()) {
        let title = controller
            .catalog()
            .get(order.deal())
            .map_or(order.deal_id(), |deal| deal.title.as_str());

        builder.push_record([
            order.reference(),
            title.to_string(),
            order.quantity().to_string(),
            order.price().to_string(),
            order.status().to_string(),
            order
                .pickup_code()
                .map(ToString::to_string)
                .unwrap_or_default(),
            remaining(controller, key, now),
        ]);
    }

    let mut table = builder.build();

    table.with(Style::modern_rounded());
    table.modify(Rows::first(), Color::BOLD);
    table.modify(Columns::new(2..4), Alignment::right());

    writeln!(out, "\n{table}")?;

    Ok(())
}

fn remaining(controller: &Controller, key: OrderKey, now: Timestamp) -> String {
    controller
        .order_view(key, now)
        .and_then(|view| view.time_remaining)
        .map(format_pickup_countdown)
        .unwrap_or_default()
}
