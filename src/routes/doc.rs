use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        bookings::{BookingList, BookingListQuery, BookingWithTickets},
        cart::{AddCartItemRequest, CartView, UpdateCartItemRequest},
        checkout::{CheckoutRequest, CheckoutResponse, DemoCheckoutResponse, WebhookAck},
        payments::PaymentList,
        tickets::{TicketList, TicketQuery, TicketWithBooking},
        tours::{TourOptionList, TourOptionQuery},
    },
    entity::payments::{ContactInfo, PaymentLine},
    models::{Booking, CartLine, Payment, Ticket, TourOption},
    response::{ApiResponse, Meta},
    routes::{
        admin, bookings, cart, checkout, health, params, payments, tickets, tours, webhooks,
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        tours::list_tour_options,
        cart::get_cart,
        cart::add_cart_item,
        cart::update_cart_item,
        cart::remove_cart_item,
        checkout::create_checkout,
        checkout::create_checkout_demo,
        webhooks::probe,
        webhooks::payment_webhook,
        payments::list_my_payments,
        payments::get_my_payment,
        bookings::list_my_bookings,
        bookings::get_my_booking,
        tickets::list_my_tickets,
        tickets::get_my_ticket,
        tickets::get_my_ticket_by_code,
        admin::list_all_bookings,
        admin::get_booking_admin,
        admin::cancel_booking
    ),
    components(
        schemas(
            TourOption,
            CartLine,
            Payment,
            PaymentLine,
            ContactInfo,
            Booking,
            Ticket,
            AddCartItemRequest,
            UpdateCartItemRequest,
            CartView,
            CheckoutRequest,
            CheckoutResponse,
            DemoCheckoutResponse,
            WebhookAck,
            PaymentList,
            BookingList,
            BookingListQuery,
            BookingWithTickets,
            TicketList,
            TicketQuery,
            TicketWithBooking,
            TourOptionList,
            TourOptionQuery,
            params::Pagination,
            Meta,
            ApiResponse<CartView>,
            ApiResponse<CheckoutResponse>,
            ApiResponse<BookingWithTickets>,
            ApiResponse<TicketWithBooking>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Tours", description = "Tour option endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Checkout", description = "Checkout and payment link endpoints"),
        (name = "Webhooks", description = "Payment provider callbacks"),
        (name = "Payments", description = "Payment endpoints"),
        (name = "Bookings", description = "Booking endpoints"),
        (name = "Tickets", description = "Ticket endpoints"),
        (name = "Admin", description = "Admin endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
