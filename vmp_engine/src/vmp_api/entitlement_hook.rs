//! Delivers the non-monetary goods of a verified order.
//!
//! The ledger records an entitlement in the same transaction that settles the order, and only reports the ones it
//! created. This hook turns those fresh grants into side effects: license group assignments in the identity provider
//! and mails to the customer. Anything that fails here is logged and dropped.
use std::{collections::BTreeSet, future::Future, pin::Pin, sync::Arc};

use futures_util::future::join_all;
use log::*;

use crate::{
    db_types::{Entitlement, EntitlementKind, Order},
    events::{Handler, OrderVerifiedEvent},
    traits::{EntitlementDispatcher, Notifier},
};

pub const LICENSE_MAIL_SUBJECT: &str = "Your digital licence";
pub const DOWNLOAD_MAIL_SUBJECT: &str = "Your download is ready";

/// Builds the `on_order_verified` hook.
pub fn entitlement_hook<D, N>(dispatcher: D, notifier: N, frontend_url: &str) -> Handler<OrderVerifiedEvent>
where
    D: EntitlementDispatcher,
    N: Notifier,
{
    let dispatcher = Arc::new(dispatcher);
    let notifier = Arc::new(notifier);
    let frontend_url = frontend_url.trim_end_matches('/').to_string();
    Arc::new(move |event: OrderVerifiedEvent| {
        let dispatcher = Arc::clone(&dispatcher);
        let notifier = Arc::clone(&notifier);
        let frontend_url = frontend_url.clone();
        Box::pin(async move {
            deliver(dispatcher.as_ref(), notifier.as_ref(), &frontend_url, event).await;
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    })
}

async fn deliver<D, N>(dispatcher: &D, notifier: &N, frontend_url: &str, event: OrderVerifiedEvent)
where
    D: EntitlementDispatcher,
    N: Notifier,
{
    let OrderVerifiedEvent { order, grants } = event;
    if grants.is_empty() {
        return;
    }
    let code = order.order_code;
    let groups = license_groups(&grants);
    if !groups.is_empty() {
        match customer_identity(&order) {
            Some(customer) => {
                let assignments = groups.iter().map(|group| dispatcher.assign_license_group(customer, group));
                for (group, result) in groups.iter().zip(join_all(assignments).await) {
                    match result {
                        Ok(()) => debug!("📬️ Order {code}: {customer} added to license group {group}"),
                        Err(e) => {
                            error!("📬️ Order {code}: could not add {customer} to license group {group}. {e}")
                        },
                    }
                }
            },
            None => warn!("📬️ Order {code} grants license groups, but has no customer to assign them to"),
        }
    }

    let Some(email) = order.customer_email.clone().filter(|e| !e.trim().is_empty()) else {
        warn!("📬️ Order {code} has {} new entitlements, but no customer email address", grants.len());
        return;
    };
    let recipients = vec![email];
    let mut mails = Vec::new();
    if !groups.is_empty() {
        let body = format!("Thank you for your purchase. Your digital licence for order {code} is now active.");
        mails.push((LICENSE_MAIL_SUBJECT, body));
    }
    for link in download_links(&grants, frontend_url) {
        let body = format!("Thank you for your purchase. Download your copy at {link}");
        mails.push((DOWNLOAD_MAIL_SUBJECT, body));
    }
    let sends = mails.iter().map(|(subject, body)| notifier.send(&recipients, subject, body));
    for result in join_all(sends).await {
        if let Err(e) = result {
            error!("📬️ Order {code}: could not notify customer. {e}");
        }
    }
}

/// Each group once, however many items of the order grant it.
fn license_groups(grants: &[Entitlement]) -> BTreeSet<String> {
    grants
        .iter()
        .filter(|g| g.kind == EntitlementKind::LicenseGroup)
        .filter_map(|g| g.license_group.clone())
        .collect()
}

fn download_links(grants: &[Entitlement], frontend_url: &str) -> Vec<String> {
    grants
        .iter()
        .filter(|g| g.kind == EntitlementKind::PdfDownload)
        .filter_map(|g| g.link_id.as_deref())
        .map(|link_id| format!("{frontend_url}/pdf/{link_id}"))
        .collect()
}

/// Authenticated customers are known to the identity provider by their user id, everyone else by email.
fn customer_identity(order: &Order) -> Option<&str> {
    order.user_id.as_deref().or(order.customer_email.as_deref()).filter(|s| !s.trim().is_empty())
}
