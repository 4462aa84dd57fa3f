//! Best-effort customer and partner notifications.
//!
//! Every public method returns `()`: failures are logged here and never
//! reach the caller. Each step runs under its own timeout, and the two
//! steps of a confirmation run concurrently so one slow channel cannot
//! hold up the other.

use crate::config::SharedConfig;
use crate::entities::FulfillmentStatus;
use crate::entities::orders::Order;
use crate::notify::{EmailMessage, EmailSender, NotifyError, PartnerClient, PartnerOrder, email};
use crate::stores::OrderStore;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

struct Settings {
    store_name: String,
    retry_url: Option<String>,
    service_level: Option<String>,
    step_timeout: Duration,
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    email: Arc<dyn EmailSender>,
    partner: Arc<dyn PartnerClient>,
    orders: Arc<dyn OrderStore>,
    config: SharedConfig,
}

async fn bounded<T>(
    limit: Duration,
    step: impl Future<Output = Result<T, NotifyError>>,
) -> Result<T, NotifyError> {
    tokio::time::timeout(limit, step)
        .await
        .map_err(|_| NotifyError::Timeout(limit))?
}

impl NotificationDispatcher {
    pub fn new(
        email: Arc<dyn EmailSender>,
        partner: Arc<dyn PartnerClient>,
        orders: Arc<dyn OrderStore>,
        config: SharedConfig,
    ) -> Self {
        Self {
            email,
            partner,
            orders,
            config,
        }
    }

    async fn settings(&self, order_number: &str) -> Settings {
        let storefront = self.config.storefront.read().await;
        let partner = self.config.partner.read().await;
        let timeouts = self.config.timeouts.read().await;
        Settings {
            store_name: storefront.store_name.clone(),
            retry_url: storefront.retry_url_for(order_number),
            service_level: partner.service_level.clone(),
            step_timeout: timeouts.notification(),
        }
    }

    /// Confirmation email and partner submission for a newly paid order.
    pub async fn order_confirmed(&self, order: &Order) {
        let settings = self.settings(&order.order_number).await;
        tokio::join!(
            self.send_email(
                order,
                "order_confirmation",
                email::order_confirmation(order, &settings.store_name),
                settings.step_timeout,
            ),
            self.submit_to_partner(order, &settings),
        );
    }

    pub async fn payment_failed(&self, order: &Order, reason: Option<&str>) {
        let settings = self.settings(&order.order_number).await;
        self.send_email(
            order,
            "payment_failed",
            email::payment_failed(
                order,
                &settings.store_name,
                reason,
                settings.retry_url.as_deref(),
            ),
            settings.step_timeout,
        )
        .await;
    }

    pub async fn order_shipped(&self, order: &Order) {
        let settings = self.settings(&order.order_number).await;
        self.send_email(
            order,
            "shipment",
            email::shipment(order, &settings.store_name),
            settings.step_timeout,
        )
        .await;
    }

    async fn send_email(
        &self,
        order: &Order,
        kind: &'static str,
        rendered: Result<EmailMessage, NotifyError>,
        limit: Duration,
    ) {
        let result = match rendered {
            Ok(message) => bounded(limit, self.email.send(message)).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(message_id) => info!(
                order_number = %order.order_number,
                email = kind,
                message_id = %message_id,
                "Customer email sent"
            ),
            Err(NotifyError::Disabled) => debug!(
                order_number = %order.order_number,
                email = kind,
                "Email disabled, not sent"
            ),
            Err(e) => warn!(
                order_number = %order.order_number,
                email = kind,
                error = %e,
                "Customer email failed"
            ),
        }
    }

    async fn submit_to_partner(&self, order: &Order, settings: &Settings) {
        let payload = PartnerOrder::from_order(order, settings.service_level.as_deref());
        let result = bounded(settings.step_timeout, self.partner.create_order(&payload)).await;
        let (status, partner_order_id) = match result {
            Ok(partner_order_id) => {
                info!(
                    order_number = %order.order_number,
                    partner_order_id = %partner_order_id,
                    "Order submitted to fulfillment partner"
                );
                (FulfillmentStatus::SubmittedToPartner, Some(partner_order_id))
            }
            Err(NotifyError::Disabled) => {
                debug!(order_number = %order.order_number, "Partner submission disabled");
                return;
            }
            Err(e) => {
                warn!(
                    order_number = %order.order_number,
                    error = %e,
                    "Fulfillment partner submission failed"
                );
                (FulfillmentStatus::PartnerFailed, None)
            }
        };
        if let Err(e) = self
            .orders
            .set_fulfillment_status(&order.order_number, status, partner_order_id)
            .await
        {
            warn!(
                order_number = %order.order_number,
                status = %status,
                error = %e,
                "Failed to record fulfillment status"
            );
        }
    }
}
