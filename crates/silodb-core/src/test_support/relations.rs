use crate::{
    db::{
        Store,
        engine::MemoryEngine,
        relation::{Backlink, RelationInfo, ResolveRelation, ToMany, ToOne},
    },
    model::{EntityModel, Property, PropertyId, PropertyKind},
    traits::{EntityId, EntityKind},
    value::Value,
};
use std::sync::Arc;

///
/// Customer
///

#[derive(Clone, Debug, Default)]
pub(crate) struct Customer {
    pub id: EntityId,
    pub name: String,
    pub orders: ToMany<Order>,
}

impl Customer {
    pub const NAME: Property = Property::new(1, "name", PropertyKind::Text);

    pub const ORDERS: RelationInfo<Self> = RelationInfo::ToMany {
        name: "orders",
        get: customer_orders,
    };
}

fn customer_orders(customer: &Customer) -> Option<&dyn ResolveRelation> {
    Some(&customer.orders)
}

const CUSTOMER_MODEL: EntityModel = EntityModel::new("Customer", &[Customer::NAME]);

impl EntityKind for Customer {
    const MODEL: &'static EntityModel = &CUSTOMER_MODEL;

    fn id(&self) -> EntityId {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn get_value(&self, property: PropertyId) -> Value {
        match property.0 {
            1 => self.name.as_str().into(),
            _ => Value::Null,
        }
    }

    fn clear_relations(&mut self) {
        self.orders.reset();
    }
}

///
/// Order
///

#[derive(Clone, Debug, Default)]
pub(crate) struct Order {
    pub id: EntityId,
    pub text: String,
    pub customer: ToOne<Customer>,
}

impl Order {
    pub const TEXT: Property = Property::new(1, "text", PropertyKind::Text);
    pub const CUSTOMER_ID: Property = Property::new(2, "customer_id", PropertyKind::Int);

    pub const CUSTOMER: RelationInfo<Self> = RelationInfo::ToOne {
        name: "customer",
        get: order_customer,
    };
}

fn order_customer(order: &Order) -> Option<&dyn ResolveRelation> {
    Some(&order.customer)
}

const ORDER_MODEL: EntityModel = EntityModel::new("Order", &[Order::TEXT, Order::CUSTOMER_ID]);

impl EntityKind for Order {
    const MODEL: &'static EntityModel = &ORDER_MODEL;

    fn id(&self) -> EntityId {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    #[allow(clippy::cast_possible_wrap)]
    fn get_value(&self, property: PropertyId) -> Value {
        match property.0 {
            1 => self.text.as_str().into(),
            2 => Value::Int(self.customer.target_id() as i64),
            _ => Value::Null,
        }
    }

    fn clear_relations(&mut self) {
        self.customer.reset();
    }
}

///
/// RelationFixture
///
/// Two customers; "ada" owns orders 1..=3, "bob" owns order 4.
///

pub(crate) struct RelationFixture {
    pub customers: Store<Customer>,
    pub orders: Store<Order>,
}

impl RelationFixture {
    pub(crate) fn new() -> Self {
        Self::over(
            Arc::new(MemoryEngine::<Customer>::new()),
            Arc::new(MemoryEngine::<Order>::new()),
        )
    }

    /// Fixture over caller-held engines.
    pub(crate) fn over(
        customers: Arc<MemoryEngine<Customer>>,
        orders: Arc<MemoryEngine<Order>>,
    ) -> Self {
        let customers = Store::<Customer>::open(customers).expect("customer store should open");
        let orders = customers.sibling::<Order>(orders);

        let fixture = Self { customers, orders };
        let ada = fixture.put_customer("ada");
        let bob = fixture.put_customer("bob");
        for (text, owner) in [("tea", ada), ("scones", ada), ("jam", ada), ("coffee", bob)] {
            fixture.put_order(text, owner);
        }

        fixture
    }

    /// Store a customer whose orders resolve through the order store.
    pub(crate) fn put_customer(&self, name: &str) -> EntityId {
        let customer = Customer {
            id: 0,
            name: name.to_string(),
            orders: ToMany::new().with_loader(Arc::new(Backlink::new(
                self.orders.downgrade(),
                Order::CUSTOMER_ID,
            ))),
        };

        self.customers.put(customer).expect("customer should store")
    }

    pub(crate) fn put_order(&self, text: &str, customer: EntityId) -> EntityId {
        let order = Order {
            id: 0,
            text: text.to_string(),
            customer: ToOne::new(customer).with_loader(Arc::new(self.customers.downgrade())),
        };

        self.orders.put(order).expect("order should store")
    }
}
