// Named operations over plans, customers, items, charges and invoices
use chrono::{DateTime, Utc};

use crate::client::CheddarClient;
use crate::deferred::Deferred;
use crate::error::{CheddarError, Result};
use crate::form::FormData;
use crate::node::{is_numeric, Node};
use crate::request::{ApiRequest, ResourcePath};

const DEFAULT_QUANTITY: f64 = 1.0;

fn plans(action: &str) -> ResourcePath {
    ResourcePath::new("plans", action)
}

fn customers(action: &str) -> ResourcePath {
    ResourcePath::new("customers", action)
}

fn invoices(action: &str) -> ResourcePath {
    ResourcePath::new("invoices", action)
}

fn item_path(action: &str, code: &str, item_code: &str) -> ResourcePath {
    customers(action)
        .param("code", code)
        .param("itemCode", item_code)
}

fn quantity_form(quantity: f64) -> FormData {
    FormData::new().field("quantity", quantity.to_string())
}

// A missing or empty body is an empty list
fn into_entries(content: Option<Node>) -> Result<Vec<Node>> {
    Ok(content.map(Node::into_list).unwrap_or_default())
}

fn first_entry(content: Option<Node>, missing: String) -> Result<Node> {
    content
        .map(Node::into_list)
        .unwrap_or_default()
        .into_iter()
        .next()
        .ok_or(CheddarError::NotFound(missing))
}

impl CheddarClient {
    // Plans

    pub fn get_all_pricing_plans(&self) -> Deferred<Vec<Node>> {
        self.call(plans("get")).map(into_entries)
    }

    /// Fetches one plan by code. An answer without any plan is `NotFound`.
    pub fn get_pricing_plan(&self, code: &str) -> Deferred<Node> {
        let missing = format!("no pricing plan with code {code}");
        self.call(plans("get").param("code", code))
            .map(move |content| first_entry(content, missing))
    }

    // Customers

    /// Lists customers, optionally narrowed by search fields such as
    /// `subscriptionStatus` or `planCode[]`.
    pub fn get_all_customers(&self, filter: Option<FormData>) -> Deferred<Vec<Node>> {
        let request = ApiRequest::new(customers("get")).with_optional_data(filter);
        self.call(request).map(into_entries)
    }

    /// Fetches one customer by code.
    ///
    /// Fails with `NotFound` when the service answers without a customer.
    /// An unknown code usually comes back as a service error instead.
    pub fn get_customer(&self, code: &str) -> Deferred<Node> {
        let missing = format!("no customer with code {code}");
        self.call(customers("get").param("code", code))
            .map(move |content| first_entry(content, missing))
    }

    pub fn create_customer(&self, data: FormData) -> Deferred<Option<Node>> {
        self.call(ApiRequest::new(customers("new")).with_data(data))
    }

    #[doc(alias = "update_customer_and_subscription")]
    pub fn edit_customer_and_subscription(
        &self,
        code: &str,
        data: FormData,
    ) -> Deferred<Option<Node>> {
        self.call(ApiRequest::new(customers("edit").param("code", code)).with_data(data))
    }

    #[doc(alias = "update_customer")]
    pub fn edit_customer(&self, code: &str, data: FormData) -> Deferred<Option<Node>> {
        self.call(ApiRequest::new(customers("edit-customer").param("code", code)).with_data(data))
    }

    #[doc(alias = "update_subscription")]
    pub fn edit_subscription(&self, code: &str, data: FormData) -> Deferred<Option<Node>> {
        self.call(
            ApiRequest::new(customers("edit-subscription").param("code", code)).with_data(data),
        )
    }

    pub fn delete_customer(&self, code: &str) -> Deferred<Option<Node>> {
        self.call(customers("delete").param("code", code))
    }

    /// Deletes every customer of the product. The service requires a
    /// confirmation timestamp close to its own clock; `None` uses now.
    pub fn delete_all_customers(&self, timestamp: Option<DateTime<Utc>>) -> Deferred<Option<Node>> {
        let confirm = timestamp.unwrap_or_else(Utc::now).timestamp();
        self.call(customers("delete-all").scope("confirm", confirm))
    }

    pub fn cancel_subscription(&self, code: &str) -> Deferred<Option<Node>> {
        self.call(customers("cancel").param("code", code))
    }

    // Items

    /// Increments an item quantity, by 1 unless told otherwise.
    pub fn add_item(
        &self,
        code: &str,
        item_code: &str,
        quantity: Option<f64>,
    ) -> Deferred<Option<Node>> {
        let form = quantity_form(quantity.unwrap_or(DEFAULT_QUANTITY));
        self.call(ApiRequest::new(item_path("add-item-quantity", code, item_code)).with_data(form))
    }

    pub fn remove_item(
        &self,
        code: &str,
        item_code: &str,
        quantity: Option<f64>,
    ) -> Deferred<Option<Node>> {
        let form = quantity_form(quantity.unwrap_or(DEFAULT_QUANTITY));
        self.call(
            ApiRequest::new(item_path("remove-item-quantity", code, item_code)).with_data(form),
        )
    }

    pub fn set_item_quantity(
        &self,
        code: &str,
        item_code: &str,
        quantity: f64,
    ) -> Deferred<Option<Node>> {
        let form = quantity_form(quantity);
        self.call(ApiRequest::new(item_path("set-item-quantity", code, item_code)).with_data(form))
    }

    // Charges

    /// Adds a one-off charge (or credit, with a negative amount) to the
    /// customer's current invoice.
    pub fn add_custom_charge(
        &self,
        code: &str,
        charge_code: &str,
        quantity: f64,
        each_amount: f64,
        description: &str,
    ) -> Deferred<Option<Node>> {
        let form = FormData::new()
            .field("chargeCode", charge_code)
            .field("quantity", quantity.to_string())
            .field("eachAmount", each_amount.to_string())
            .field("description", description);
        self.call(ApiRequest::new(customers("add-charge").param("code", code)).with_data(form))
    }

    pub fn delete_custom_charge(&self, code: &str, charge_id: &str) -> Deferred<Option<Node>> {
        let form = FormData::new().field("chargeId", charge_id);
        self.call(ApiRequest::new(customers("delete-charge").param("code", code)).with_data(form))
    }

    // Invoices

    /// Resends an invoice email. Numeric input is taken as the invoice
    /// number, anything else as the invoice id.
    pub fn resend_invoice_email(&self, id_or_number: &str) -> Deferred<Option<Node>> {
        let key = if is_numeric(id_or_number) { "number" } else { "id" };
        let form = FormData::new().field(key, id_or_number);
        self.call(ApiRequest::new(invoices("send-email")).with_data(form))
    }

    pub fn one_time_invoice(&self, customer_code: &str, data: FormData) -> Deferred<Option<Node>> {
        self.call(ApiRequest::new(invoices("new").param("code", customer_code)).with_data(data))
    }
}
