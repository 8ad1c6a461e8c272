//! Endpoint catalog for the train-ticketing services.
//!
//! Each [`Endpoint`] is one load test task: a single HTTP call against one
//! service port. Two profiles are provided:
//!
//! | Profile | Deployment                               | Request ceiling      |
//! |---------|------------------------------------------|----------------------|
//! | coarse  | services grouped behind ten shared ports | none                 |
//! | fine    | one port per microservice                | `--limit` per task   |

use std::fmt;

use goose::prelude::GooseMethod;
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::{json, Value};

/// HTTP methods used by the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
        })
    }
}

impl From<HttpMethod> for GooseMethod {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => GooseMethod::Get,
            HttpMethod::Post => GooseMethod::Post,
            HttpMethod::Put => GooseMethod::Put,
        }
    }
}

/// Request path, either fixed or with a randomly chosen last segment
#[derive(Debug, Clone, Copy)]
pub enum Route {
    Fixed(&'static str),
    OneOf {
        prefix: &'static str,
        choices: &'static [&'static str],
    },
}

impl Route {
    fn render<R: Rng>(&self, rng: &mut R) -> String {
        match self {
            Route::Fixed(path) => (*path).to_string(),
            Route::OneOf { prefix, choices } => {
                let choice = choices.choose(rng).copied().unwrap_or_default();
                format!("{prefix}{choice}")
            }
        }
    }

    /// Path with any random segment left as `{...}`
    pub fn template(&self) -> String {
        match self {
            Route::Fixed(path) => (*path).to_string(),
            Route::OneOf { prefix, .. } => format!("{prefix}{{...}}"),
        }
    }
}

const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const PASSWORD_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz123456";

const USER_ID: &str = "4d2a46c7-71cb-4cf1-b5bb-b68406d9da6f";

fn random_string<R: Rng>(rng: &mut R, alphabet: &[u8], len: usize) -> String {
    (0..len)
        .filter_map(|_| alphabet.choose(rng))
        .map(|&c| c as char)
        .collect()
}

/// JSON request bodies
#[derive(Debug, Clone, Copy)]
pub enum Body {
    Empty,
    /// New station with a random six letter name
    Station,
    /// Plain JSON array of city names
    Cities(&'static [&'static str]),
    /// Existing user document with a fresh random password
    User,
    /// Consign price record with the given id
    ConsignPrice(&'static str),
    TravelPlan,
    RoutePlan,
}

impl Body {
    pub fn build<R: Rng>(&self, rng: &mut R) -> Option<Value> {
        let body = match self {
            Body::Empty => return None,
            Body::Station => json!({
                "id": "string",
                "name": random_string(rng, LOWERCASE, 6),
                "stayTime": 2
            }),
            Body::Cities(cities) => json!(cities),
            Body::User => json!({
                "documentNum": "2135488099312X",
                "documentType": 1,
                "email": "trainticket_notify@163.com",
                "gender": 1,
                "password": random_string(rng, PASSWORD_CHARS, 7),
                "userId": USER_ID,
                "userName": "fdse_microservice"
            }),
            Body::ConsignPrice(id) => json!({
                "beyondPrice": 1,
                "id": id,
                "index": 0,
                "initialPrice": 2,
                "initialWeight": 1,
                "withinPrice": 2
            }),
            Body::TravelPlan => json!({
                "departureTime": "2013-08-12",
                "endPlace": "shanghai",
                "startPlace": "nanjing"
            }),
            Body::RoutePlan => json!({
                "endStation": "shanghai",
                "num": 0,
                "startStation": "nanjing",
                "travelDate": "2013-08-01"
            }),
        };
        Some(body)
    }
}

/// Share of the run limit a gated task receives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quota {
    Full,
    /// Half the limit, rounded up; used when two tasks split one budget
    Half,
}

impl Quota {
    pub fn ceiling(self, limit: u64) -> u64 {
        match self {
            Quota::Full => limit,
            Quota::Half => limit.div_ceil(2),
        }
    }
}

/// One load test task
#[derive(Debug, Clone, Copy)]
pub struct Endpoint {
    /// Scenario name reported by Goose
    pub scenario: &'static str,
    pub port: u16,
    pub method: HttpMethod,
    pub route: Route,
    pub body: Body,
    pub quota: Quota,
}

/// A request ready to be sent
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedRequest {
    pub method: HttpMethod,
    pub path: String,
    pub body: Option<Value>,
}

impl Endpoint {
    pub const fn get(scenario: &'static str, port: u16, path: &'static str) -> Self {
        Self {
            scenario,
            port,
            method: HttpMethod::Get,
            route: Route::Fixed(path),
            body: Body::Empty,
            quota: Quota::Full,
        }
    }

    pub const fn post(scenario: &'static str, port: u16, path: &'static str, body: Body) -> Self {
        Self {
            scenario,
            port,
            method: HttpMethod::Post,
            route: Route::Fixed(path),
            body,
            quota: Quota::Full,
        }
    }

    pub const fn put(scenario: &'static str, port: u16, path: &'static str, body: Body) -> Self {
        Self {
            scenario,
            port,
            method: HttpMethod::Put,
            route: Route::Fixed(path),
            body,
            quota: Quota::Full,
        }
    }

    pub const fn with_route(mut self, route: Route) -> Self {
        self.route = route;
        self
    }

    pub const fn with_body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    pub const fn with_quota(mut self, quota: Quota) -> Self {
        self.quota = quota;
        self
    }

    /// Pick the random parts of the request (path segment, payload fields)
    pub fn render<R: Rng>(&self, rng: &mut R) -> RenderedRequest {
        RenderedRequest {
            method: self.method,
            path: self.route.render(rng),
            body: self.body.build(rng),
        }
    }
}

// ============================================================================
// Profiles
// ============================================================================

/// Deployment layout under test
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Profile {
    /// Coarse-grained deployment, services share ports, no request ceiling
    Coarse,
    /// Fine-grained deployment, one port per service, ceiling per task
    Fine,
}

impl Profile {
    pub fn name(self) -> &'static str {
        match self {
            Profile::Coarse => "coarse",
            Profile::Fine => "fine",
        }
    }

    pub fn endpoints(self) -> &'static [Endpoint] {
        match self {
            Profile::Coarse => COARSE_ENDPOINTS,
            Profile::Fine => FINE_ENDPOINTS,
        }
    }

    /// Whether tasks of this profile are capped by the run limit
    pub fn is_gated(self) -> bool {
        matches!(self, Profile::Fine)
    }
}

const BASIC_CITIES: &[&str] = &["beijing", "shanghai", "xuzhou", "hangzhou"];
const FOOD_STORE_CITIES: &[&str] = &["beijing", "shanghai", "nanjing", "hangzhou"];

const BASIC_ROUTE: Route = Route::OneOf {
    prefix: "/api/v1/basicservice/basic/",
    choices: BASIC_CITIES,
};

const ORDER_PATH: &str = "/api/v1/orderservice/order/9bb0ac3e-b305-4929-84a9-2dfac9de3471";
const CONSIGN_PATH: &str =
    "/api/v1/consignservice/consigns/account/4d2a46c7-71cb-4cf1-b5bb-b68406d9da6f";
const TRAIN_TYPE_PATH: &str = "/api/v1/travelservice/train_types/G1234";
const ORDER_OTHER_BY_DATE_PATH: &str = "/api/v1/orderOtherService/orderOther/2013-08-09/1";

/// Services grouped behind shared gateway ports
pub const COARSE_ENDPOINTS: &[Endpoint] = &[
    Endpoint::post("StationService", 12345, "/api/v1/stationservice/stations", Body::Station),
    Endpoint::get("PriceService", 17525, "/api/v1/priceservice/prices"),
    Endpoint::get("TrainFoodService", 14567, "/api/v1/trainfoodservice/trainfoods"),
    Endpoint::get("TrainService", 14567, "/api/v1/trainservice/trains"),
    Endpoint::get("RouteService", 12346, "/api/v1/routeservice/routes"),
    Endpoint::get("ContactsService", 12347, "/api/v1/contactservice/contacts"),
    Endpoint::get("AdminBasicInfoService", 18767, "/api/v1/adminbasicservice/adminbasic/contacts"),
    Endpoint::get("AdminBasicInfoService2", 18767, "/api/v1/adminbasicservice/adminbasic/stations"),
    Endpoint::get("AdminBasicInfoService3", 18767, "/api/v1/adminbasicservice/adminbasic/prices"),
    Endpoint::get("AdminOrderService", 18767, "/api/v1/adminorderservice/adminorder"),
    Endpoint::get("BasicService", 18888, "").with_route(BASIC_ROUTE),
    Endpoint::get("OrderService", 17853, "/api/v1/orderservice/order"),
    Endpoint::get("OrderService2", 17853, ORDER_PATH),
    Endpoint::get("OrderOtherService", 18673, "/api/v1/orderOtherService/orderOther"),
    Endpoint::get("SeatService", 14567, "/api/v1/seatservice/welcome"),
    Endpoint::post(
        "StationFoodService",
        12345,
        "/api/v1/stationfoodservice/stationfoodstores",
        Body::Cities(FOOD_STORE_CITIES),
    ),
    Endpoint::get("Travel2Service", 12345, "/api/v1/travel2service/trips"),
    Endpoint::put("UserService", 12346, "/api/v1/userservice/users", Body::User),
    Endpoint::get("AdminTravelService", 17525, "/api/v1/admintravelservice/admintravel"),
    Endpoint::get("AdminRouteService", 18767, "/api/v1/adminrouteservice/adminroute"),
    Endpoint::get("AdminUserService", 18888, "/api/v1/adminuserservice/users"),
    Endpoint::get("AssuranceService", 18888, "/api/v1/assuranceservice/assurances"),
    Endpoint::get("ConfigService", 12347, "/api/v1/configservice/configs"),
    Endpoint::post(
        "ConsignPriceService",
        12347,
        "/api/v1/consignpriceservice/consignprice",
        Body::ConsignPrice("015e39a9-8d6f-43d5-b1b2-395d971ba7b7"),
    ),
    Endpoint::get("ConsignService", 12347, CONSIGN_PATH),
    Endpoint::get("NotificationService", 17853, "/api/v1/notifyservice/test_send_mq"),
    Endpoint::get("SecurityService", 14567, "/api/v1/securityservice/securityConfigs"),
    Endpoint::get("TravelService", 12346, TRAIN_TYPE_PATH),
    Endpoint::get("CancelService", 18888, "/api/v1/cancelservice/welcome"),
    Endpoint::get("ExecuteService", 18856, "/api/v1/executeservice/welcome"),
    Endpoint::get("FoodDeliverService", 18856, "/api/v1/fooddeliveryservice/orders/all"),
    Endpoint::get("FoodService", 18856, "/api/v1/foodservice/orders"),
    Endpoint::get("InsidePaymentService", 18673, "/api/v1/inside_pay_service/inside_payment/account"),
    Endpoint::get("OrderOther2Service", 18673, ORDER_OTHER_BY_DATE_PATH),
    Endpoint::get("PaymentService", 17853, "/api/v1/paymentservice/payment"),
    Endpoint::get("PreserveService", 18856, "/api/v1/preserveservice/welcome"),
    Endpoint::get("RebookService", 17525, "/api/v1/rebookservice/welcome"),
    Endpoint::get("WaitOrderService", 17525, "/api/v1/waitorderservice/orders"),
    Endpoint::post(
        "TravelPlanService",
        12345,
        "/api/v1/travelplanservice/travelPlan/cheapest",
        Body::TravelPlan,
    ),
    Endpoint::post(
        "RoutePlanService",
        12346,
        "/api/v1/routeplanservice/routePlan/cheapestRoute",
        Body::RoutePlan,
    ),
    Endpoint::get("PreserveOtherService", 18673, "/api/v1/preserveotherservice/welcome"),
];

/// One port per microservice
pub const FINE_ENDPOINTS: &[Endpoint] = &[
    Endpoint::post("StationService", 12345, "/api/v1/stationservice/stations", Body::Station),
    Endpoint::get("PriceService", 16579, "/api/v1/priceservice/prices"),
    Endpoint::get("TrainFoodService", 19999, "/api/v1/trainfoodservice/trainfoods"),
    Endpoint::get("TrainService", 14567, "/api/v1/trainservice/trains"),
    Endpoint::get("RouteService", 11178, "/api/v1/routeservice/routes"),
    Endpoint::get("ContactsService", 12347, "/api/v1/contactservice/contacts"),
    Endpoint::get("AdminBasicInfoService", 18767, "/api/v1/adminbasicservice/adminbasic/contacts"),
    Endpoint::get("AdminBasicInfoService3", 18769, "/api/v1/adminbasicservice/adminbasic/prices"),
    Endpoint::get("AdminOrderService", 16112, "/api/v1/adminorderservice/adminorder"),
    Endpoint::get("BasicService", 15680, "").with_route(BASIC_ROUTE),
    Endpoint::get("OrderService", 12031, "/api/v1/orderservice/order"),
    Endpoint::get("OrderService2", 12033, ORDER_PATH),
    Endpoint::get("OrderOtherService", 12032, "/api/v1/orderOtherService/orderOther"),
    Endpoint::get("SeatService", 18898, "/api/v1/seatservice/welcome"),
    // The store lookup is a GET carrying the city list as its body.
    Endpoint::get("StationFoodService", 18855, "/api/v1/stationfoodservice/stationfoodstores")
        .with_body(Body::Cities(FOOD_STORE_CITIES)),
    Endpoint::get("Travel2Service", 16346, "/api/v1/travel2service/trips"),
    Endpoint::put("UserService", 12342, "/api/v1/userservice/users", Body::User),
    Endpoint::get("AdminTravelService", 16114, "/api/v1/admintravelservice/admintravel")
        .with_quota(Quota::Half),
    Endpoint::get("AdminTravelService2", 16114, "/api/v1/admintravelservice/admintravel")
        .with_quota(Quota::Half),
    Endpoint::get("AdminRouteService", 16113, "/api/v1/adminrouteservice/adminroute"),
    Endpoint::get("AdminUserService", 16115, "/api/v1/adminuserservice/users"),
    Endpoint::get("AssuranceService", 18888, "/api/v1/assuranceservice/assurances"),
    Endpoint::get("ConfigService", 15679, "/api/v1/configservice/configs"),
    Endpoint::post(
        "ConsignPriceService",
        16110,
        "/api/v1/consignpriceservice/consignprice",
        Body::ConsignPrice("99b7ba12-155f-41c2-9a4a-38705c010f0f"),
    ),
    Endpoint::get("ConsignService", 16111, CONSIGN_PATH),
    Endpoint::get("NotificationService", 17853, "/api/v1/notifyservice/test_send_mq"),
    Endpoint::get("SecurityService", 11188, "/api/v1/securityservice/securityConfigs"),
    Endpoint::get("TravelService", 12346, TRAIN_TYPE_PATH),
    Endpoint::get("CancelService", 18885, "/api/v1/cancelservice/welcome"),
    Endpoint::get("ExecuteService", 12386, "/api/v1/executeservice/welcome"),
    Endpoint::get("FoodDeliverService", 18957, "/api/v1/fooddeliveryservice/orders/all"),
    Endpoint::get("FoodService", 18856, "/api/v1/foodservice/orders"),
    Endpoint::get("InsidePaymentService", 18673, "/api/v1/inside_pay_service/inside_payment/account"),
    Endpoint::get("OrderOther2Service", 12034, ORDER_OTHER_BY_DATE_PATH),
    Endpoint::get("PaymentService", 19001, "/api/v1/paymentservice/payment"),
    Endpoint::get("PreserveService", 14568, "/api/v1/preserveservice/welcome"),
    Endpoint::get("RebookService", 18886, "/api/v1/rebookservice/welcome"),
    Endpoint::get("WaitOrderService", 17525, "/api/v1/waitorderservice/orders"),
    Endpoint::post(
        "TravelPlanService",
        14322,
        "/api/v1/travelplanservice/travelPlan/cheapest",
        Body::TravelPlan,
    ),
    Endpoint::post(
        "RoutePlanService",
        14578,
        "/api/v1/routeplanservice/routePlan/cheapestRoute",
        Body::RoutePlan,
    ),
    Endpoint::get("PreserveOtherService", 14569, "/api/v1/preserveotherservice/welcome"),
];
