use prettytable::{
    format::{LinePosition, LineSeparator, TableFormat},
    row,
    Table,
};
use vmp_engine::db_types::{Account, Order, Payment, Vendor};

fn markdown_format() -> TableFormat {
    prettytable::format::FormatBuilder::new()
        .column_separator('|')
        .borders('|')
        .separator(LinePosition::Title, LineSeparator::new('-', '|', '|', '|'))
        .padding(1, 1)
        .build()
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

pub fn format_accounts(accounts: &[Account]) -> String {
    if accounts.is_empty() {
        return "No accounts".to_string();
    }
    let mut table = Table::new();
    table.set_format(markdown_format());
    table.set_titles(row!["ID", "Name", "Type", "Vendor", "User", "Balance", "Updated At"]);
    for account in accounts {
        table.add_row(row![
            account.id,
            account.name,
            account.account_type,
            optional(account.vendor_id),
            optional(account.user_id.as_deref()),
            r->account.balance,
            account.updated_at.to_rfc3339()
        ]);
    }
    table.to_string()
}

pub fn format_vendor_account(vendor: &Vendor, account: &Account) -> String {
    let mut table = Table::new();
    table.set_format(markdown_format());
    table.add_row(row!["License", vendor.license_id]);
    table.add_row(row!["Name", format!("{} {}", vendor.first_name, vendor.last_name).trim()]);
    table.add_row(row!["Email", vendor.email]);
    table.add_row(row!["Disabled", vendor.is_disabled]);
    table.add_row(row!["Account", account.id]);
    table.add_row(row!["Balance", account.balance]);
    table.add_row(row!["Last payout", optional(vendor.last_payout.map(|d| d.to_rfc3339()))]);
    table.to_string()
}

pub fn format_payments(payments: &[Payment]) -> String {
    if payments.is_empty() {
        return "No open payments".to_string();
    }
    let mut table = Table::new();
    table.set_format(markdown_format());
    table.set_titles(row!["ID", "Created At", "From", "To", "Amount", "Role", "Order", "Authorized by"]);
    for p in payments {
        table.add_row(row![
            p.id,
            p.created_at.to_rfc3339(),
            p.sender,
            p.receiver,
            r->p.amount,
            optional(p.role),
            optional(p.order_id),
            p.authorized_by
        ]);
    }
    table.to_string()
}

pub fn format_order(order: &Order) -> String {
    let mut table = Table::new();
    table.set_format(markdown_format());
    table.set_titles(row!["Item", "Quantity", "Price", "From", "To", "Role"]);
    for e in &order.entries {
        table.add_row(row![e.item_id, e.quantity, r->e.price, e.sender, e.receiver, e.role]);
    }
    let status = match order.verified_at {
        Some(at) if order.verified => format!("verified at {}", at.to_rfc3339()),
        _ => "not verified".to_string(),
    };
    format!(
        "Order {} ({status})\nTransaction: {}\nTotal: {}\n{table}",
        order.order_code,
        order.transaction_id.as_deref().unwrap_or("-"),
        order.total()
    )
}
